//! Core traits for source-dialect migrations.
//!
//! This module defines the abstraction the migration engine is built around:
//!
//! - [`SourceMigration`]: turns a source catalog into a MySQL catalog
//! - [`TypeMapping`]: result of mapping one source datatype
//! - [`MigrationParameter`]: an option a dialect declares
//!
//! # Design Patterns
//!
//! - **Template Method**: the default `migrate_*` methods define the walk over
//!   catalog → schemas → tables → columns/indices/keys/triggers → views/routines
//! - **Strategy**: each dialect overrides the hooks it needs (identifiers,
//!   charsets, datatypes, default values, table options)
//!
//! The default bodies delegate to free functions in [`crate::migration::base`],
//! so an override can run the shared behavior and then adjust the result.

use serde::{Deserialize, Serialize};

use crate::core::schema::{
    Catalog, Column, ForeignKey, Index, ObjectId, Routine, Schema, Table, Trigger, View,
};
use crate::migration::{base, defaults, MigrationContext};
use crate::state::{ObjectRef, PendingLog, Severity};

/// Option name of the schema mapping policy, declared by every dialect.
pub const SCHEMA_MAPPING_METHOD: &str = "schemaMappingMethod";

/// Value type of a migration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Boolean,
    String,
}

/// A migration option declared by a dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationParameter {
    pub name: String,
    pub caption: String,
    pub description: String,
    pub param_type: ParamType,
    pub default_value: String,
}

impl MigrationParameter {
    pub fn boolean(name: &str, caption: &str, description: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            caption: caption.to_string(),
            description: description.to_string(),
            param_type: ParamType::Boolean,
            default_value: default.to_string(),
        }
    }

    pub fn string(name: &str, caption: &str, description: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            caption: caption.to_string(),
            description: description.to_string(),
            param_type: ParamType::String,
            default_value: default.to_string(),
        }
    }

    /// The engine-wide schema mapping option.
    pub fn schema_mapping_method() -> Self {
        Self::string(
            SCHEMA_MAPPING_METHOD,
            "Schema mapping",
            "How source schemas are laid out in the target: keep_schemas, drop_catalog or merge_with_prefix",
            "keep_schemas",
        )
    }

    /// `<dialect>:annotateUntranslatedBodies`.
    pub fn annotate_untranslated_bodies(dialect: &str) -> Self {
        Self::boolean(
            &format!("{}:annotateUntranslatedBodies", dialect),
            "Annotate untranslated bodies",
            "Log a note on every view, routine and trigger whose SQL body is copied verbatim",
            true,
        )
    }
}

/// Result of mapping a source datatype onto a target simple type.
///
/// Fields left as `None` keep whatever the column already carries (the source
/// column's length, precision and scale are copied before mapping).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    /// Target simple type name (e.g. "VARCHAR", "LONGTEXT").
    pub target_type: String,
    pub length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    /// Flags added to the target column (e.g. "UNSIGNED").
    pub flags: Vec<String>,
    /// Character set forced on the target column.
    pub character_set: Option<String>,
    /// Log entry describing the conversion.
    pub message: Option<(Severity, String)>,
}

impl TypeMapping {
    /// Create a lossless type mapping.
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            length: None,
            precision: None,
            scale: None,
            flags: Vec::new(),
            character_set: None,
            message: None,
        }
    }

    /// Create a lossy type mapping with a warning.
    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            message: Some((Severity::Warning, warning.into())),
            ..Self::lossless(target_type)
        }
    }

    /// Create a mapping that is worth a note in the log.
    pub fn noted(target_type: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            message: Some((Severity::Note, note.into())),
            ..Self::lossless(target_type)
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self.message, Some((Severity::Warning | Severity::Error, _)))
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_scale(mut self, scale: i32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.push(flag.to_ascii_uppercase());
        self
    }

    pub fn with_character_set(mut self, charset: impl Into<String>) -> Self {
        self.character_set = Some(charset.into());
        self
    }
}

/// Migration of one source dialect into MySQL.
///
/// Implementations provide the dialect hooks ([`migrate_datatype_for_column`]
/// is the only required one) and inherit the object walk. The walk records
/// every `(source, target)` pair in the state's object map and writes mapper
/// messages to the migration log. Per-object failures are logged and the walk
/// continues with the next sibling.
///
/// [`migrate_datatype_for_column`]: SourceMigration::migrate_datatype_for_column
pub trait SourceMigration: Send + Sync {
    /// Dialect identifier (e.g. "mssql", "sql92").
    fn name(&self) -> &str;

    /// Name of the source RDBMS record (e.g. "Mssql").
    fn source_rdbms_name(&self) -> &str;

    /// Options this dialect understands.
    fn migration_options(&self) -> Vec<MigrationParameter> {
        vec![MigrationParameter::schema_mapping_method()]
    }

    /// Log a note on views, routines and triggers whose body is copied as is.
    fn annotate_untranslated_bodies(&self, _cx: &MigrationContext<'_>) -> bool {
        true
    }

    // ===== Hooks =====

    /// Map a source identifier to a MySQL identifier.
    ///
    /// `dots_allowed` is set for names that live inside a table (columns).
    fn migrate_identifier(&self, name: &str, log: &mut PendingLog, _dots_allowed: bool) -> String {
        base::migrate_identifier(name, log)
    }

    /// Map a source character set and collation.
    fn migrate_charset_collation(
        &self,
        _cx: &mut MigrationContext<'_>,
        charset: &str,
        collation: &str,
        _source: &ObjectRef,
        _target: &ObjectRef,
    ) -> (String, String) {
        (charset.to_string(), collation.to_string())
    }

    /// Give `target` a MySQL datatype. Returns `false` (with an error logged)
    /// when no datatype could be found.
    fn migrate_datatype_for_column(
        &self,
        cx: &mut MigrationContext<'_>,
        source_table: &Table,
        source: &Column,
        target: &mut Column,
    ) -> bool;

    /// Map a column default; an empty result removes it.
    fn migrate_column_default_value(
        &self,
        cx: &mut MigrationContext<'_>,
        default_value: &str,
        source: &Column,
        target: &mut Column,
    ) -> String {
        defaults::migrate_default_value(cx, default_value, source, target)
    }

    /// Copy dialect-specific column attributes (auto increment, generation).
    fn migrate_column_extras(
        &self,
        _cx: &mut MigrationContext<'_>,
        _source: &Column,
        _target: &mut Column,
    ) {
    }

    /// Copy dialect-specific table attributes (engine, partitioning).
    fn migrate_table_options(
        &self,
        _cx: &mut MigrationContext<'_>,
        _source_schema: &Schema,
        _source: &Table,
        _target: &mut Table,
    ) {
    }

    // ===== Object walk =====

    fn migrate_catalog(&self, cx: &mut MigrationContext<'_>, source: &Catalog) -> Catalog {
        base::migrate_catalog(self, cx, source)
    }

    fn migrate_schema(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Schema,
        target_catalog: &mut Catalog,
    ) -> Option<ObjectId> {
        base::migrate_schema(self, cx, source, target_catalog)
    }

    fn migrate_schema_contents(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Schema,
        target: &mut Schema,
    ) {
        base::migrate_schema_contents(self, cx, source, target)
    }

    fn migrate_table_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source_schema: &Schema,
        source: &Table,
        target_schema: &mut Schema,
    ) -> Option<ObjectId> {
        base::migrate_table_to_mysql(self, cx, source_schema, source, target_schema)
    }

    fn migrate_table_columns_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Table,
        target: &mut Table,
    ) {
        base::migrate_table_columns_to_mysql(self, cx, source, target)
    }

    fn migrate_table_column_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source_table: &Table,
        source: &Column,
        target_table: &Table,
    ) -> Option<Column> {
        base::migrate_table_column_to_mysql(self, cx, source_table, source, target_table)
    }

    fn migrate_table_indices_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Table,
        target: &mut Table,
    ) {
        base::migrate_table_indices_to_mysql(self, cx, source, target)
    }

    fn migrate_table_index_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source_table: &Table,
        source: &Index,
        target_table: &Table,
    ) -> Option<Index> {
        base::migrate_table_index_to_mysql(self, cx, source_table, source, target_table)
    }

    fn migrate_table_primary_key(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Table,
        target: &mut Table,
    ) {
        base::migrate_table_primary_key(cx, source, target)
    }

    /// Foreign keys, run once every table of the catalog exists.
    fn migrate_table_foreign_keys_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source_schema: &Schema,
        source: &Table,
        target: &mut Table,
    ) -> usize {
        base::migrate_table_foreign_keys_to_mysql(self, cx, source_schema, source, target)
    }

    fn migrate_table_foreign_key_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source_schema: &Schema,
        source_table: &Table,
        source: &ForeignKey,
        target_table: &Table,
    ) -> Option<ForeignKey> {
        base::migrate_table_foreign_key_to_mysql(
            self,
            cx,
            source_schema,
            source_table,
            source,
            target_table,
        )
    }

    /// Post-mapping fixups of one table. Returns the number of foreign keys
    /// added.
    fn migrate_table_to_mysql_2nd_pass(
        &self,
        cx: &mut MigrationContext<'_>,
        source_schema: &Schema,
        source: &Table,
        target: &mut Table,
    ) -> usize {
        self.migrate_table_foreign_keys_to_mysql(cx, source_schema, source, target)
    }

    fn migrate_trigger_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Trigger,
        target_table: &Table,
    ) -> Option<Trigger> {
        base::migrate_trigger_to_mysql(self, cx, source, target_table)
    }

    fn migrate_view_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &View,
        target_schema: &Schema,
    ) -> Option<View> {
        base::migrate_view_to_mysql(self, cx, source, target_schema)
    }

    fn migrate_routine_to_mysql(
        &self,
        cx: &mut MigrationContext<'_>,
        source: &Routine,
        target_schema: &Schema,
    ) -> Option<Routine> {
        base::migrate_routine_to_mysql(self, cx, source, target_schema)
    }

    /// Single walk over the finished target catalog, e.g. to store the cast
    /// expressions a data copy needs.
    fn migrate_update_for_changes(&self, _cx: &mut MigrationContext<'_>, _target: &mut Catalog) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mapping_lossless() {
        let mapping = TypeMapping::lossless("BIGINT");
        assert_eq!(mapping.target_type, "BIGINT");
        assert!(!mapping.is_lossy());
        assert!(mapping.message.is_none());
    }

    #[test]
    fn test_type_mapping_lossy() {
        let mapping = TypeMapping::lossy("VARCHAR", "HIERARCHYID stored as text");
        assert!(mapping.is_lossy());
        assert_eq!(
            mapping.message,
            Some((Severity::Warning, "HIERARCHYID stored as text".to_string()))
        );
    }

    #[test]
    fn test_type_mapping_builders() {
        let mapping = TypeMapping::noted("TINYINT", "BIT became TINYINT(1)")
            .with_length(1)
            .with_flag("unsigned")
            .with_character_set("utf8mb4");
        assert!(!mapping.is_lossy());
        assert_eq!(mapping.length, Some(1));
        assert_eq!(mapping.flags, vec!["UNSIGNED".to_string()]);
        assert_eq!(mapping.character_set.as_deref(), Some("utf8mb4"));
        assert!(mapping.precision.is_none());
    }

    #[test]
    fn test_declared_parameters() {
        let method = MigrationParameter::schema_mapping_method();
        assert_eq!(method.name, SCHEMA_MAPPING_METHOD);
        assert_eq!(method.param_type, ParamType::String);
        assert_eq!(method.default_value, "keep_schemas");

        let annotate = MigrationParameter::annotate_untranslated_bodies("mssql");
        assert_eq!(annotate.name, "mssql:annotateUntranslatedBodies");
        assert_eq!(annotate.default_value, "true");
    }
}
