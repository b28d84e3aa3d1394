//! Configuration validation.

use super::Config;
use crate::core::catalog::DialectCatalog;
use crate::core::traits::SCHEMA_MAPPING_METHOD;
use crate::core::version::Version;
use crate::error::{MigrateError, Result};

const IGNORE_LIST_TYPES: &[&str] = &["tables", "views", "routines", "triggers"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let dialects = DialectCatalog::with_builtins();
    if !dialects.has_dialect(&config.source_dialect) {
        return Err(MigrateError::Config(format!(
            "source_dialect must be one of [{}], got '{}'",
            dialects.dialect_names().join(", "),
            config.source_dialect
        )));
    }

    if let Some(version) = &config.target_version {
        if Version::parse(version).is_none() {
            return Err(MigrateError::Config(format!(
                "target_version '{}' is not a version string",
                version
            )));
        }
    }

    if let Some(method) = config.options.get(SCHEMA_MAPPING_METHOD) {
        method.parse::<crate::planner::SchemaMappingMethod>()?;
    }

    for entry in &config.ignore_list {
        let Some((kind, pattern)) = entry.split_once(':') else {
            return Err(MigrateError::Config(format!(
                "ignore_list entry '{}' must look like '<type>:<schema>.<name>'",
                entry
            )));
        };
        if !IGNORE_LIST_TYPES.contains(&kind) {
            return Err(MigrateError::Config(format!(
                "ignore_list entry '{}' has unknown type '{}'",
                entry, kind
            )));
        }
        if pattern.is_empty() {
            return Err(MigrateError::Config(format!(
                "ignore_list entry '{}' has an empty pattern",
                entry
            )));
        }
    }

    for (i, mapping) in config.datatype_mappings.iter().enumerate() {
        if mapping.source_type.trim().is_empty() || mapping.target_type.trim().is_empty() {
            return Err(MigrateError::Config(format!(
                "datatype_mappings[{}] needs both source_type and target_type",
                i
            )));
        }
        if let (Some(from), Some(to)) = (mapping.length_from, mapping.length_to) {
            if from > to {
                return Err(MigrateError::Config(format!(
                    "datatype_mappings[{}] has length_from {} greater than length_to {}",
                    i, from, to
                )));
            }
        }
    }

    Ok(())
}
