//! Core abstractions of the migration engine.
//!
//! - [`schema`]: catalog model (catalogs, schemas, tables, columns, keys)
//! - [`rdbms`]: RDBMS records and simple datatype registries
//! - [`version`]: server versions and MySQL capability gates
//! - [`identifier`]: identifier quoting and truncation
//! - [`lookup`]: id → location index over a catalog
//! - [`validate`]: structural invariants of a catalog
//! - [`traits`]: the [`SourceMigration`] trait dialects implement
//! - [`catalog`]: dialect registry for dependency injection
//!
//! # Design Patterns
//!
//! - **Template Method**: `SourceMigration` supplies the object walk, dialects
//!   override hooks
//! - **Registry**: `DialectCatalog` resolves a dialect by name at run time

pub mod catalog;
pub mod identifier;
pub mod lookup;
pub mod rdbms;
pub mod schema;
pub mod traits;
pub mod validate;
pub mod version;

// Re-export commonly used types for convenience
pub use catalog::DialectCatalog;
pub use lookup::CatalogIndex;
pub use rdbms::{Rdbms, SimpleType, TypeGroup, TypeRegistry};
pub use schema::{
    Catalog, Column, DatatypeRef, Entity, ForeignKey, ForeignKeyRule, Index, IndexColumn,
    ObjectId, ObjectKind, Routine, RoutineType, Schema, Table, Trigger, View,
};
pub use traits::{MigrationParameter, ParamType, SourceMigration, TypeMapping};
pub use version::Version;
