//! Error types for the migration library.
//!
//! Per-object mapping problems (notes, warnings and mapping errors) never
//! surface here: they are recorded in the migration log and the run
//! continues. Only failures that stop a run are represented by
//! [`MigrateError`].

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, unknown option values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller handed the engine unusable inputs
    /// (no source catalog, no target DBMS, missing target version).
    #[error("Contract violation: {0}")]
    Contract(String),

    /// The target catalog cannot be shaped as requested
    #[error("Structural error: {0}")]
    Structural(String),

    /// Report template failed to parse or render
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the report template engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// Malformed tag or unterminated token
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A block was opened but never closed, or closed without being opened
    #[error("unbalanced block '{tag}'")]
    Unbalanced { tag: String },

    /// A key used inside an expression does not exist in the current scope
    #[error("key '{key}' not found in context '{context}' (available: {})", available.join(", "))]
    MissingKey {
        key: String,
        context: String,
        available: Vec<String>,
    },

    /// Expression could not be parsed or evaluated
    #[error("invalid expression: {0}")]
    Expression(String),
}

impl MigrateError {
    /// Create a Contract error
    pub fn contract(message: impl Into<String>) -> Self {
        MigrateError::Contract(message.into())
    }

    /// Create a Structural error
    pub fn structural(message: impl Into<String>) -> Self {
        MigrateError::Structural(message.into())
    }

    /// Process exit code used by the CLI for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) => 2,
            MigrateError::Contract(_) => 3,
            MigrateError::Structural(_) => 4,
            MigrateError::Template(_) => 5,
            MigrateError::Io(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 2);
        assert_eq!(MigrateError::contract("x").exit_code(), 3);
        assert_eq!(MigrateError::structural("x").exit_code(), 4);
        let err: MigrateError = TemplateError::Expression("bad".into()).into();
        assert_eq!(err.exit_code(), 5);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(MigrateError::from(io).exit_code(), 1);
    }

    #[test]
    fn test_missing_key_message_lists_available_keys() {
        let err = TemplateError::MissingKey {
            key: "count".into(),
            context: "schemata".into(),
            available: vec!["name".into(), "tables".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'count'"));
        assert!(msg.contains("schemata"));
        assert!(msg.contains("name, tables"));
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let err: MigrateError = TemplateError::Unbalanced { tag: "tables".into() }.into();
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Template error"));
        assert!(detailed.contains("Caused by"));
        assert!(detailed.contains("unbalanced block 'tables'"));
    }
}
