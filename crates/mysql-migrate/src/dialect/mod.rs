//! Source dialects.
//!
//! Each dialect implements [`SourceMigration`](crate::core::SourceMigration)
//! and overrides only the hooks where its RDBMS differs from the shared
//! object walk:
//!
//! - [`GenericMigration`]: user datatype mapping table, then same-name types
//! - [`Sql92Migration`]: ANSI types from ODBC sources
//! - [`MssqlMigration`]: Microsoft SQL Server
//! - [`MysqlMigration`]: MySQL to MySQL copies
//!
//! Dialects are registered by name in a
//! [`DialectCatalog`](crate::core::DialectCatalog):
//!
//! ```rust,ignore
//! let catalog = DialectCatalog::with_builtins();
//! let dialect = catalog.require("mssql")?;
//! migration::migrate(&mut state, dialect.as_ref())?;
//! ```

mod generic;
mod mssql;
mod mysql;
mod sql92;

pub use generic::GenericMigration;
pub use mssql::MssqlMigration;
pub use mysql::MysqlMigration;
pub use sql92::Sql92Migration;
