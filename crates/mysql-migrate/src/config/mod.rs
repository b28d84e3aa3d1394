//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::core::traits::SCHEMA_MAPPING_METHOD;
use crate::core::version::Version;
use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML (or JSON) file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// The configured target version, if any.
    pub fn parsed_target_version(&self) -> Result<Option<Version>> {
        self.target_version
            .as_deref()
            .map(|v| v.parse::<Version>())
            .transpose()
    }

    /// Option map handed to the migration state, with the schema mapping
    /// method filled in unless it was set explicitly.
    pub fn migration_params(&self) -> std::collections::BTreeMap<String, String> {
        let mut params = self.options.clone();
        params
            .entry(SCHEMA_MAPPING_METHOD.to_string())
            .or_insert_with(|| self.schema_mapping_method.as_str().to_string());
        params
    }
}
