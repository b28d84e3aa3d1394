//! MySQL → MySQL copy.
//!
//! Identifiers, charsets, datatypes and defaults pass through unchanged; the
//! MySQL-only column and table attributes are carried over.

use crate::core::schema::{Column, Schema, Table};
use crate::core::traits::{SourceMigration, TypeMapping};
use crate::migration::{base, MigrationContext};
use crate::state::PendingLog;

#[derive(Debug, Clone, Default)]
pub struct MysqlMigration;

impl MysqlMigration {
    pub fn new() -> Self {
        Self
    }
}

impl SourceMigration for MysqlMigration {
    fn name(&self) -> &str {
        "mysql"
    }

    fn source_rdbms_name(&self) -> &str {
        "Mysql"
    }

    fn annotate_untranslated_bodies(&self, _cx: &MigrationContext<'_>) -> bool {
        false
    }

    fn migrate_identifier(&self, name: &str, _log: &mut PendingLog, _dots_allowed: bool) -> String {
        name.to_string()
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
        base::apply_type_mapping(
            cx,
            source_table,
            source,
            target,
            TypeMapping::lossless(source_type),
        )
    }

    fn migrate_column_default_value(
        &self,
        _cx: &mut MigrationContext<'_>,
        default_value: &str,
        _source: &Column,
        _target: &mut Column,
    ) -> String {
        default_value.to_string()
    }

    fn migrate_column_extras(
        &self,
        _cx: &mut MigrationContext<'_>,
        source: &Column,
        target: &mut Column,
    ) {
        target.auto_increment = source.auto_increment;
        target.expression = source.expression.clone();
        target.generated = source.generated;
        target.generated_storage = source.generated_storage.clone();
    }

    fn migrate_table_options(
        &self,
        _cx: &mut MigrationContext<'_>,
        _source_schema: &Schema,
        source: &Table,
        target: &mut Table,
    ) {
        target.options = source.options.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rdbms::Rdbms;
    use crate::core::schema::{Catalog, DatatypeRef, ObjectId, PartitionDefinition};
    use crate::core::version::Version;
    use crate::state::MigrationState;

    fn source_catalog() -> Catalog {
        let mut catalog = Catalog::new(ObjectId(1), "shop");
        catalog.version = Version::new(5, 7, 20);
        catalog.simple_datatypes = Rdbms::mysql().simple_datatypes;

        let mut schema = Schema::new(ObjectId(2), ObjectId(1), "shop");
        schema.default_character_set_name = "utf8mb4".into();
        schema.default_collation_name = "utf8mb4_bin".into();

        let mut table = Table::new(ObjectId(3), ObjectId(2), "`orders`");
        table.options.engine = "InnoDB".into();
        table.options.partition_type = "HASH".into();
        table.options.partition_expression = "id".into();
        table.options.partition_count = 2;
        table.options.partition_definitions = vec![PartitionDefinition {
            name: "p0".into(),
            subpartition_definitions: vec![PartitionDefinition {
                name: "s0".into(),
                ..Default::default()
            }],
            ..Default::default()
        }];

        let mut id = Column::new(ObjectId(4), ObjectId(3), "id");
        id.datatype = Some(DatatypeRef::Simple("INT".into()));
        id.auto_increment = true;
        id.is_not_null = true;

        let mut total = Column::new(ObjectId(5), ObjectId(3), "total");
        total.datatype = Some(DatatypeRef::Simple("decimal".into()));
        total.precision = 10;
        total.scale = 2;
        total.default_value = "'0.00'".into();

        let mut doubled = Column::new(ObjectId(6), ObjectId(3), "doubled");
        doubled.datatype = Some(DatatypeRef::Simple("DECIMAL".into()));
        doubled.generated = true;
        doubled.expression = "total * 2".into();
        doubled.generated_storage = "STORED".into();

        table.columns = vec![id, total, doubled];
        schema.tables.push(table);
        catalog.schemata.push(schema);
        catalog
    }

    #[test]
    fn test_copy_keeps_everything() {
        let mut state = MigrationState::with_source(source_catalog());
        crate::migration::migrate(&mut state, &MysqlMigration::new()).unwrap();

        let target = state.target().unwrap();
        assert_eq!(target.version, Version::new(5, 7, 20));

        let schema = &target.schemata[0];
        assert_eq!(schema.default_collation_name, "utf8mb4_bin");

        let table = &schema.tables[0];
        assert_eq!(table.name, "`orders`");
        assert_eq!(table.options.engine, "InnoDB");
        assert_eq!(table.options.partition_definitions[0].subpartition_definitions[0].name, "s0");

        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "total", "doubled"]);
        assert_eq!(table.columns[1].datatype, Some(DatatypeRef::Simple("DECIMAL".into())));
        assert_eq!((table.columns[1].precision, table.columns[1].scale), (10, 2));
        assert_eq!(table.columns[1].default_value, "'0.00'");
        assert!(table.columns[2].generated);
        assert_eq!(table.columns[2].expression, "total * 2");
        assert_eq!(table.columns[2].generated_storage, "STORED");
    }

    #[test]
    fn test_auto_increment_outside_key_is_cleared() {
        let mut state = MigrationState::with_source(source_catalog());
        crate::migration::migrate(&mut state, &MysqlMigration::new()).unwrap();

        // no primary key in the source, so the flag cannot survive
        let table = &state.target().unwrap().schemata[0].tables[0];
        assert!(!table.columns[0].auto_increment);
        assert_eq!(state.migration_log.count(crate::state::Severity::Warning), 1);
    }
}
