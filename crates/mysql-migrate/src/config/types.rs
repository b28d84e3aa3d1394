//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::planner::SchemaMappingMethod;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source dialect name (generic, sql92, mysql, mssql).
    #[serde(default = "default_source_dialect")]
    pub source_dialect: String,

    /// MySQL server version to generate for. When absent, MySQL sources
    /// keep their own version and everything else targets 5.5.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,

    /// How schemas are laid out in the target catalog.
    #[serde(default)]
    pub schema_mapping_method: SchemaMappingMethod,

    /// Free-form object migration options, handed to the dialect.
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    /// Objects to skip, as `<type>:<schema>.<name>` or `<type>:*`.
    #[serde(default)]
    pub ignore_list: Vec<String>,

    /// User-supplied datatype mappings for the generic dialect.
    #[serde(default)]
    pub datatype_mappings: Vec<DatatypeMapping>,

    /// Report template to use instead of the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_template: Option<PathBuf>,
}

fn default_source_dialect() -> String {
    "generic".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dialect: default_source_dialect(),
            target_version: None,
            schema_mapping_method: SchemaMappingMethod::default(),
            options: BTreeMap::new(),
            ignore_list: Vec::new(),
            datatype_mappings: Vec::new(),
            report_template: None,
        }
    }
}

/// A user-defined datatype mapping rule.
///
/// A rule applies when `source_type` matches the source column's type name
/// (case-insensitive) and, if a length window is given, the column's length
/// falls inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatatypeMapping {
    pub source_type: String,
    pub target_type: String,

    /// Length to force on the target column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i32>,

    /// Precision to force on the target column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i32>,

    /// Scale to force on the target column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,

    /// Inclusive lower bound of the source length window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_from: Option<i32>,

    /// Inclusive upper bound of the source length window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_to: Option<i32>,

    /// Add the UNSIGNED flag to the target column.
    #[serde(default)]
    pub unsigned: bool,
}

impl DatatypeMapping {
    /// Does this rule cover a source column of the given type and length?
    ///
    /// Length bounds only apply to columns with a known (positive) length.
    pub fn matches(&self, type_name: &str, length: i32) -> bool {
        if !self.source_type.eq_ignore_ascii_case(type_name) {
            return false;
        }
        if length > 0 {
            if self.length_from.is_some_and(|from| from > 0 && length < from) {
                return false;
            }
            if self.length_to.is_some_and(|to| to > 0 && length > to) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_length_window() {
        let mapping = DatatypeMapping {
            source_type: "varchar2".into(),
            target_type: "VARCHAR".into(),
            length_from: Some(1),
            length_to: Some(4000),
            ..Default::default()
        };
        assert!(mapping.matches("VARCHAR2", 200));
        assert!(!mapping.matches("VARCHAR2", 5000));
        assert!(!mapping.matches("NUMBER", 200));
        // unknown length ignores the window
        assert!(mapping.matches("varchar2", -1));
    }
}
