//! SQL-92 source dialect (generic ODBC sources).

use crate::core::schema::{Column, Schema, Table};
use crate::core::traits::{MigrationParameter, SourceMigration, TypeMapping};
use crate::core::version::Version;
use crate::migration::{base, charset, MigrationContext};
use crate::state::ObjectRef;

const DIALECT: &str = "sql92";

/// Cast used by a data copy to read XML columns as text.
const XML_CAST_EXPRESSION: &str = "CAST(? as NVARCHAR(max)) as ?";

#[derive(Debug, Clone, Default)]
pub struct Sql92Migration;

impl Sql92Migration {
    pub fn new() -> Self {
        Self
    }
}

impl SourceMigration for Sql92Migration {
    fn name(&self) -> &str {
        DIALECT
    }

    fn source_rdbms_name(&self) -> &str {
        "Generic"
    }

    fn migration_options(&self) -> Vec<MigrationParameter> {
        vec![
            MigrationParameter::schema_mapping_method(),
            MigrationParameter::annotate_untranslated_bodies(DIALECT),
        ]
    }

    fn annotate_untranslated_bodies(&self, cx: &MigrationContext<'_>) -> bool {
        cx.option_bool(&format!("{}:annotateUntranslatedBodies", DIALECT), true)
    }

    fn migrate_charset_collation(
        &self,
        cx: &mut MigrationContext<'_>,
        charset: &str,
        collation: &str,
        source: &ObjectRef,
        target: &ObjectRef,
    ) -> (String, String) {
        charset::migrate_to_utf8(cx, charset, collation, source, target)
    }

    fn migrate_datatype_for_column(
        &self,
        cx: &mut MigrationContext<'_>,
        source_table: &Table,
        source: &Column,
        target: &mut Column,
    ) -> bool {
        let Some(source_type) = base::resolve_source_type(cx, source_table, source, target) else {
            return false;
        };
        let mapping = sql92_to_mysql(&source_type, target.length, &cx.target_version);
        base::apply_type_mapping(cx, source_table, source, target, mapping)
    }

    fn migrate_table_to_mysql_2nd_pass(
        &self,
        cx: &mut MigrationContext<'_>,
        source_schema: &Schema,
        source: &Table,
        target: &mut Table,
    ) -> usize {
        let migrated = self.migrate_table_foreign_keys_to_mysql(cx, source_schema, source, target);

        for column in &source.columns {
            let is_xml = cx
                .source
                .resolved_type_name(column)
                .is_some_and(|name| name == "XML");
            if !is_xml {
                continue;
            }
            let Some(target_column) = cx.target_of(column.id).and_then(|id| target.column(id)) else {
                continue;
            };
            let key = format!("columnTypeCastExpression:{}", target_column.name);
            target
                .custom_data
                .insert(key, XML_CAST_EXPRESSION.to_string());
        }

        migrated
    }
}

/// Number of bytes a TINY/plain/MEDIUM variant of TEXT and BLOB holds.
const TINY_LIMIT: i32 = 1 << 8;
const PLAIN_LIMIT: i32 = 1 << 16;
const MEDIUM_LIMIT: i32 = 1 << 24;

/// Size prefix (`TINY`, ``, `MEDIUM`, `LONG`) for a large object of the
/// given length. Unknown lengths get the largest variant.
fn lob_prefix(length: i32) -> &'static str {
    match length {
        l if l <= 0 => "LONG",
        l if l < TINY_LIMIT => "TINY",
        l if l < PLAIN_LIMIT => "",
        l if l < MEDIUM_LIMIT => "MEDIUM",
        _ => "LONG",
    }
}

/// Map an SQL-92 datatype to MySQL.
fn sql92_to_mysql(source_type: &str, length: i32, target_version: &Version) -> TypeMapping {
    match source_type {
        // Character strings
        // A negative length is an unbounded (MAX) column and lands in LONGTEXT.
        "VARCHAR" | "NVARCHAR" => {
            if (0..256).contains(&length) {
                TypeMapping::lossless("VARCHAR")
            } else if (0..65536).contains(&length) {
                if target_version.major < 5 {
                    TypeMapping::lossless("MEDIUMTEXT").with_length(-1)
                } else {
                    TypeMapping::lossless("VARCHAR")
                }
            } else {
                TypeMapping::lossless("LONGTEXT").with_length(-1)
            }
        }
        "CHAR" | "NCHAR" => {
            if length < 256 {
                TypeMapping::lossless("CHAR")
            } else {
                TypeMapping::lossless("LONGTEXT").with_length(-1)
            }
        }

        // Integer types
        "SMALLINT" | "INT" | "INTEGER" | "BIGINT" => {
            TypeMapping::lossless(source_type).with_precision(-1)
        }

        // Numeric types
        "DECIMAL" | "NUMERIC" => TypeMapping::lossless("DECIMAL"),
        "REAL" | "FLOAT" => TypeMapping::lossless("FLOAT"),
        "DOUBLE PRECISION" => TypeMapping::lossless("DOUBLE"),

        // Large objects
        "BLOB" => TypeMapping::lossless(format!("{}BLOB", lob_prefix(length))).with_length(-1),
        "CLOB" => TypeMapping::lossless(format!("{}TEXT", lob_prefix(length))).with_length(-1),

        // Date/time types
        "TIMESTAMP" | "DATE" | "TIME" => TypeMapping::lossless(source_type),

        // Bits and booleans
        "BIT" | "BIT VARYING" => TypeMapping::lossless("BIT"),
        "BOOLEAN" => TypeMapping::noted(
            "TINYINT",
            "Source column type BOOLEAN was migrated to TINYINT(1)",
        )
        .with_length(1),

        "XML" => TypeMapping::noted("TEXT", "Source column type XML was migrated to TEXT"),

        // Same name and hope for the best
        other => TypeMapping::lossy(
            other,
            format!(
                "Source column type {} has no SQL-92 mapping and was kept as is",
                other
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rdbms::Rdbms;
    use crate::core::schema::{Catalog, DatatypeRef, ObjectId};
    use crate::state::{MigrationState, Severity};

    fn v56() -> Version {
        Version::new(5, 6, 0)
    }

    fn source_catalog() -> Catalog {
        let mut catalog = Catalog::new(ObjectId(1), "src");
        catalog.simple_datatypes = Rdbms::sql92().simple_datatypes;
        catalog
    }

    fn migrate_column(type_name: &str, length: i32) -> (bool, Column, MigrationState) {
        let catalog = source_catalog();
        let mut state = MigrationState::new();
        let table = Table::new(ObjectId(3), ObjectId(2), "t");
        let mut source = Column::new(ObjectId(10), ObjectId(3), "c");
        source.datatype = Some(DatatypeRef::Simple(type_name.to_string()));
        source.length = length;
        let mut target = Column::new(ObjectId(100), ObjectId(30), "c");
        target.length = length;
        let ok = {
            let mut cx = MigrationContext::new(&mut state, &catalog, v56()).unwrap();
            Sql92Migration::new().migrate_datatype_for_column(&mut cx, &table, &source, &mut target)
        };
        (ok, target, state)
    }

    fn type_of(column: &Column) -> &str {
        column.datatype.as_ref().map(|d| d.name()).unwrap_or("")
    }

    // =========================================================================
    // Rule table
    // =========================================================================

    #[test]
    fn test_varchar_buckets() {
        assert_eq!(sql92_to_mysql("VARCHAR", 100, &v56()).target_type, "VARCHAR");
        assert_eq!(sql92_to_mysql("VARCHAR", 1000, &v56()).target_type, "VARCHAR");
        assert_eq!(sql92_to_mysql("VARCHAR", 100000, &v56()).target_type, "LONGTEXT");
        assert_eq!(sql92_to_mysql("NVARCHAR", -1, &v56()).target_type, "LONGTEXT");
        assert_eq!(
            sql92_to_mysql("VARCHAR", 1000, &Version::new(4, 1, 0)).target_type,
            "MEDIUMTEXT"
        );
    }

    #[test]
    fn test_char_buckets() {
        assert_eq!(sql92_to_mysql("CHAR", 10, &v56()).target_type, "CHAR");
        assert_eq!(sql92_to_mysql("NCHAR", 300, &v56()).target_type, "LONGTEXT");
    }

    #[test]
    fn test_lob_buckets() {
        assert_eq!(sql92_to_mysql("BLOB", 100, &v56()).target_type, "TINYBLOB");
        assert_eq!(sql92_to_mysql("BLOB", 60000, &v56()).target_type, "BLOB");
        assert_eq!(sql92_to_mysql("CLOB", 1 << 20, &v56()).target_type, "MEDIUMTEXT");
        assert_eq!(sql92_to_mysql("CLOB", 1 << 30, &v56()).target_type, "LONGTEXT");
        assert_eq!(sql92_to_mysql("CLOB", -1, &v56()).target_type, "LONGTEXT");
    }

    #[test]
    fn test_numeric_rules() {
        let int = sql92_to_mysql("INT", -1, &v56());
        assert_eq!(int.target_type, "INT");
        assert_eq!(int.precision, Some(-1));
        assert_eq!(sql92_to_mysql("NUMERIC", -1, &v56()).target_type, "DECIMAL");
        assert_eq!(sql92_to_mysql("REAL", -1, &v56()).target_type, "FLOAT");
        assert_eq!(sql92_to_mysql("DOUBLE PRECISION", -1, &v56()).target_type, "DOUBLE");
    }

    // =========================================================================
    // Column migration
    // =========================================================================

    #[test]
    fn test_boolean_becomes_tinyint_with_note() {
        let (ok, target, state) = migrate_column("BOOLEAN", -1);
        assert!(ok);
        assert_eq!(type_of(&target), "TINYINT");
        assert_eq!(target.length, 1);
        assert_eq!(state.migration_log.count(Severity::Note), 1);
        assert_eq!(
            state.migration_log.entries()[0].message,
            "Source column type BOOLEAN was migrated to TINYINT(1)"
        );
    }

    #[test]
    fn test_xml_becomes_text_with_note() {
        let (ok, target, state) = migrate_column("XML", -1);
        assert!(ok);
        assert_eq!(type_of(&target), "TEXT");
        assert_eq!(state.migration_log.count(Severity::Note), 1);
    }

    #[test]
    fn test_long_varchar_becomes_longtext() {
        let (ok, target, _) = migrate_column("VARCHAR", 100000);
        assert!(ok);
        assert_eq!(type_of(&target), "LONGTEXT");
        assert_eq!(target.length, -1);
    }

    #[test]
    fn test_unknown_type_is_error() {
        let (ok, target, state) = migrate_column("INTERVAL", -1);
        assert!(!ok);
        assert!(target.datatype.is_none());
        assert_eq!(state.migration_log.count(Severity::Warning), 1);
        assert_eq!(state.migration_log.count(Severity::Error), 1);
        let entries = state.migration_log.entries();
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[1].severity, Severity::Error);
    }

    #[test]
    fn test_declared_options() {
        let names: Vec<String> = Sql92Migration::new()
            .migration_options()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["schemaMappingMethod", "sql92:annotateUntranslatedBodies"]);
    }
}
