//! # mysql-migrate
//!
//! Cross-RDBMS schema migration engine producing MySQL catalogs.
//!
//! Given a catalog reverse-engineered from a source database, this library
//! produces:
//!
//! - **A MySQL target catalog** with datatypes, defaults, identifiers and
//!   collations mapped per source dialect and target server version
//! - **A DDL script** that creates the target catalog
//! - **A migration report** rendered from the per-object migration log
//!
//! Source dialects: generic, SQL-92, MySQL and Microsoft SQL Server. Schemas
//! can be kept, merged into one, or merged with prefixed object names.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_migrate::{load_catalog, Config, DialectCatalog, Migrator};
//!
//! fn main() -> mysql_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let catalog = load_catalog("catalog.yaml")?;
//!     let migrator = Migrator::new(config, DialectCatalog::with_builtins())?;
//!     let result = migrator.run(catalog)?;
//!     println!("{}", result.ddl);
//!     println!("{} errors", result.errors);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod emitter;
pub mod error;
pub mod migration;
pub mod orchestrator;
pub mod planner;
pub mod report;
pub mod source;
pub mod state;

// Re-exports for convenient access
pub use config::{Config, DatatypeMapping};
pub use crate::core::{Catalog, CatalogIndex, DialectCatalog, SourceMigration, Version};
pub use emitter::{emit_script, SqlEmitter};
pub use error::{MigrateError, Result, TemplateError};
pub use orchestrator::{MigrationResult, Migrator};
pub use planner::{SchemaMappingMethod, SchemaPlanner};
pub use report::{render_report, ReportOptions, Template};
pub use source::{load_catalog, CatalogDocument};
pub use state::{LogEntry, MigrationLog, MigrationState, ObjectMap, Severity};
