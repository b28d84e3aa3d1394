//! Dialect catalog for explicit dependency injection.
//!
//! The [`DialectCatalog`] maps a source dialect name to the
//! [`SourceMigration`] that handles it. It is built explicitly and handed to
//! the [`Migrator`](crate::orchestrator::Migrator), so callers can register
//! their own dialects next to (or instead of) the built-in ones.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MigrateError, Result};

use super::traits::SourceMigration;

/// Registry of source dialect migrations.
///
/// ```rust,ignore
/// let mut catalog = DialectCatalog::new();
/// catalog.register(MssqlMigration::new());
/// let dialect = catalog.require("mssql")?;
/// ```
#[derive(Default)]
pub struct DialectCatalog {
    dialects: HashMap<String, Arc<dyn SourceMigration>>,
}

impl DialectCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the generic, SQL-92, MySQL and SQL Server
    /// dialects registered.
    pub fn with_builtins() -> Self {
        use crate::dialect::{GenericMigration, MssqlMigration, MysqlMigration, Sql92Migration};

        let mut catalog = Self::new();
        catalog.register(GenericMigration::new());
        catalog.register(Sql92Migration::new());
        catalog.register(MysqlMigration::new());
        catalog.register(MssqlMigration::new());
        catalog
    }

    /// Register a dialect under its own name, replacing any previous one.
    pub fn register(&mut self, dialect: impl SourceMigration + 'static) {
        self.register_arc(Arc::new(dialect));
    }

    /// Register a shared dialect.
    pub fn register_arc(&mut self, dialect: Arc<dyn SourceMigration>) {
        self.dialects
            .insert(dialect.name().to_ascii_lowercase(), dialect);
    }

    /// Get a dialect by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Arc<dyn SourceMigration>> {
        self.dialects.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Get a dialect by name, returning an error if not found.
    pub fn require(&self, name: &str) -> Result<Arc<dyn SourceMigration>> {
        self.get(name).ok_or_else(|| {
            MigrateError::Config(format!(
                "Unknown source dialect: '{}'. Supported dialects: {}",
                name,
                self.dialect_names().join(", ")
            ))
        })
    }

    pub fn has_dialect(&self, name: &str) -> bool {
        self.dialects.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered dialect names, sorted.
    pub fn dialect_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DialectCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectCatalog")
            .field("dialects", &self.dialect_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, Table};
    use crate::migration::MigrationContext;

    // Dialect that types nothing
    struct MockMigration {
        name: &'static str,
    }

    impl SourceMigration for MockMigration {
        fn name(&self) -> &str {
            self.name
        }

        fn source_rdbms_name(&self) -> &str {
            "Mock"
        }

        fn migrate_datatype_for_column(
            &self,
            _cx: &mut MigrationContext<'_>,
            _source_table: &Table,
            _source: &Column,
            _target: &mut Column,
        ) -> bool {
            false
        }
    }

    #[test]
    fn test_catalog_registration() {
        let mut catalog = DialectCatalog::new();
        assert!(!catalog.has_dialect("test"));

        catalog.register(MockMigration { name: "test" });
        assert!(catalog.has_dialect("test"));
        assert!(catalog.has_dialect("TEST"));
        assert_eq!(catalog.get("test").unwrap().source_rdbms_name(), "Mock");
    }

    #[test]
    fn test_catalog_require() {
        let mut catalog = DialectCatalog::new();
        catalog.register(MockMigration { name: "test" });

        assert!(catalog.require("test").is_ok());
        let err = catalog.require("oracle").err().unwrap();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_builtins_are_sorted() {
        let catalog = DialectCatalog::with_builtins();
        assert_eq!(catalog.dialect_names(), vec!["generic", "mssql", "mysql", "sql92"]);
        assert_eq!(catalog.get("mssql").unwrap().source_rdbms_name(), "Mssql");
    }
}
