//! Generic source dialect: user datatype mappings, then same-name types.

use crate::core::schema::{Column, Table};
use crate::core::traits::{SourceMigration, TypeMapping};
use crate::migration::{base, MigrationContext};

/// Migration for sources without a dedicated dialect.
///
/// Datatypes are looked up in the state's generic datatype mapping table
/// first; a type without a rule must exist in MySQL under the same name.
#[derive(Debug, Clone, Default)]
pub struct GenericMigration;

impl GenericMigration {
    pub fn new() -> Self {
        Self
    }
}

impl SourceMigration for GenericMigration {
    fn name(&self) -> &str {
        "generic"
    }

    fn source_rdbms_name(&self) -> &str {
        "Generic"
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

        let Some(rule) = cx
            .state
            .generic_datatype_mappings
            .iter()
            .find(|m| m.matches(&source_type, source.length))
            .cloned()
        else {
            return base::apply_type_mapping(
                cx,
                source_table,
                source,
                target,
                TypeMapping::lossless(source_type),
            );
        };

        if cx.target_type(&rule.target_type).is_none() {
            cx.error(
                source,
                &*target,
                format!(
                    "Unknown mapped datatype \"{}\" for source type \"{}\" (check type mapping table)",
                    rule.target_type, source_type
                ),
            );
            return false;
        }

        let mut mapping = TypeMapping::lossless(rule.target_type);
        mapping.length = rule.length;
        mapping.precision = rule.precision;
        mapping.scale = rule.scale;
        if rule.unsigned {
            mapping = mapping.with_flag("UNSIGNED");
        }
        base::apply_type_mapping(cx, source_table, source, target, mapping)
    }
}
