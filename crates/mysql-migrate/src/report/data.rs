//! Data tree handed to the report template.

use serde::Serialize;

use crate::core::lookup::CatalogIndex;
use crate::core::schema::{Catalog, ForeignKey, Index, ObjectId, RoutineType, Schema, Table};
use crate::emitter::SqlEmitter;
use crate::error::Result;
use crate::state::{LogEntry, MigrationLog, MigrationState, ObjectRef, Severity};

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub generated_at: String,
    pub source: Endpoint,
    pub target: Endpoint,
    pub schema_mapping_method: String,
    pub totals: Totals,
    pub schemata: Vec<SchemaSummary>,
    pub migration_issues: Vec<Issue>,
    pub creation_issues: Vec<Issue>,
    pub data_copy: Vec<Issue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub rdbms: String,
    pub version: String,
    pub catalog: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    pub notes: usize,
    pub warnings: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaSummary {
    pub name: String,
    /// Comma separated source schemas that ended up here.
    pub source_names: String,
    pub tables: usize,
    pub triggers: usize,
    pub views: usize,
    pub procedures: usize,
    pub functions: usize,
    pub table_list: Vec<TableDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableDetail {
    pub schema: String,
    pub name: String,
    pub source_name: String,
    pub columns: Vec<ColumnDetail>,
    pub foreign_keys: Vec<ForeignKeyDetail>,
    pub indices: Vec<IndexDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDetail {
    pub name: String,
    pub source_name: String,
    pub source_type: String,
    pub target_type: String,
    pub nullable: bool,
    pub issues: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyDetail {
    pub name: String,
    pub columns: String,
    pub referenced_table: String,
    pub referenced_columns: String,
    pub on_update: String,
    pub on_delete: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexDetail {
    pub name: String,
    pub kind: String,
    pub columns: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: String,
    pub object: String,
    pub message: String,
}

/// Names and types shown for objects that could not be resolved.
const UNKNOWN: &str = "(unknown)";
const NOT_MIGRATED: &str = "(not migrated)";

struct Resolver<'a> {
    state: &'a MigrationState,
    source: &'a Catalog,
    target: &'a Catalog,
    source_index: CatalogIndex,
    target_index: CatalogIndex,
}

impl<'a> Resolver<'a> {
    fn qualified(&self, object: &ObjectRef) -> String {
        let name = self
            .target_index
            .qualified_name(self.target, object.id)
            .or_else(|| self.source_index.qualified_name(self.source, object.id))
            .unwrap_or_else(|| object.name.clone());
        format!("{} {}", object.kind.label(), name)
    }

    fn issue(&self, entry: &LogEntry) -> Issue {
        let object = entry
            .target
            .as_ref()
            .or(entry.source.as_ref())
            .map(|object| self.qualified(object))
            .unwrap_or_else(|| format!("catalog {}", self.target.name));
        Issue {
            severity: entry.severity.label().to_string(),
            object,
            message: entry.message.clone(),
        }
    }

    fn issues<'l>(&self, logs: impl IntoIterator<Item = &'l MigrationLog>) -> Vec<Issue> {
        logs.into_iter()
            .flat_map(MigrationLog::iter)
            .map(|entry| self.issue(entry))
            .collect()
    }

    fn source_name(&self, target_id: ObjectId) -> String {
        self.state
            .object_map
            .source_of(target_id)
            .and_then(|id| self.source_index.qualified_name(self.source, id))
            .unwrap_or_default()
    }

    fn schema(&self, schema: &Schema) -> SchemaSummary {
        let source_names: Vec<&str> = self
            .source
            .schemata
            .iter()
            .filter(|s| self.state.object_map.target_of(s.id) == Some(schema.id))
            .map(|s| s.name.as_str())
            .collect();

        SchemaSummary {
            name: schema.name.clone(),
            source_names: source_names.join(", "),
            tables: schema.tables.len(),
            triggers: schema.triggers().count(),
            views: schema.views.len(),
            procedures: schema
                .routines
                .iter()
                .filter(|r| r.routine_type == RoutineType::Procedure)
                .count(),
            functions: schema
                .routines
                .iter()
                .filter(|r| r.routine_type == RoutineType::Function)
                .count(),
            table_list: schema.tables.iter().map(|t| self.table(schema, t)).collect(),
        }
    }

    fn table(&self, schema: &Schema, table: &Table) -> TableDetail {
        let source_types = SqlEmitter::new(self.source);
        let target_types = SqlEmitter::new(self.target);

        let columns = table
            .columns
            .iter()
            .map(|column| {
                let source_column = self
                    .state
                    .object_map
                    .source_of(column.id)
                    .and_then(|id| self.source_index.column(self.source, id));
                let source_type = source_column
                    .map(|c| {
                        if c.formatted_raw_type.is_empty() {
                            source_types.column_type(c).unwrap_or_else(|| UNKNOWN.to_string())
                        } else {
                            c.formatted_raw_type.clone()
                        }
                    })
                    .unwrap_or_else(|| UNKNOWN.to_string());
                ColumnDetail {
                    name: column.name.clone(),
                    source_name: source_column.map(|c| c.name.clone()).unwrap_or_default(),
                    source_type,
                    target_type: target_types
                        .column_type(column)
                        .unwrap_or_else(|| NOT_MIGRATED.to_string()),
                    nullable: !column.is_not_null,
                    issues: self.state.migration_log.for_target(column.id).count(),
                }
            })
            .collect();

        TableDetail {
            schema: schema.name.clone(),
            name: table.name.clone(),
            source_name: self.source_name(table.id),
            columns,
            foreign_keys: table
                .foreign_keys
                .iter()
                .map(|fk| self.foreign_key(table, fk))
                .collect(),
            indices: table.indices.iter().map(|index| index_detail(table, index)).collect(),
        }
    }

    fn foreign_key(&self, table: &Table, fk: &ForeignKey) -> ForeignKeyDetail {
        let referenced = self.target_index.table(self.target, fk.referenced_table);
        let referenced_columns = fk
            .referenced_columns
            .iter()
            .map(|id| {
                referenced
                    .and_then(|t| t.column(*id))
                    .map_or(UNKNOWN, |c| c.name.as_str())
            })
            .collect::<Vec<_>>()
            .join(", ");

        ForeignKeyDetail {
            name: fk.name.clone(),
            columns: column_names(table, &fk.columns),
            referenced_table: self
                .target_index
                .qualified_name(self.target, fk.referenced_table)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            referenced_columns,
            on_update: fk.update_rule.as_sql().to_string(),
            on_delete: fk.delete_rule.as_sql().to_string(),
        }
    }
}

fn column_names(table: &Table, ids: &[ObjectId]) -> String {
    ids.iter()
        .map(|id| table.column(*id).map_or(UNKNOWN, |c| c.name.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn index_detail(table: &Table, index: &Index) -> IndexDetail {
    let kind = if index.is_primary {
        "PRIMARY".to_string()
    } else if !index.index_type.is_empty() && index.index_type != "INDEX" {
        index.index_type.clone()
    } else if index.unique {
        "UNIQUE".to_string()
    } else {
        "INDEX".to_string()
    };
    let columns: Vec<_> = index.columns.iter().map(|c| c.column).collect();
    IndexDetail {
        name: index.name.clone(),
        kind,
        columns: column_names(table, &columns),
    }
}

/// Build the report data tree from a finished migration.
pub fn build(
    state: &MigrationState,
    source_rdbms: &str,
    schema_mapping_method: &str,
    generated_at: &str,
) -> Result<ReportData> {
    let source = state.source()?;
    let target = state.target()?;
    let resolver = Resolver {
        state,
        source,
        target,
        source_index: CatalogIndex::build(source),
        target_index: CatalogIndex::build(target),
    };

    let logs = [
        &state.object_migration_log,
        &state.migration_log,
        &state.creation_log,
        &state.data_transfer_log,
    ];
    let totals = logs.iter().fold(Totals::default(), |mut totals, log| {
        totals.notes += log.count(Severity::Note);
        totals.warnings += log.count(Severity::Warning);
        totals.errors += log.count(Severity::Error);
        totals
    });

    Ok(ReportData {
        generated_at: generated_at.to_string(),
        source: Endpoint {
            rdbms: source_rdbms.to_string(),
            version: source.version.to_string(),
            catalog: source.name.clone(),
        },
        target: Endpoint {
            rdbms: state.target_rdbms.caption.clone(),
            version: target.version.to_string(),
            catalog: target.name.clone(),
        },
        schema_mapping_method: schema_mapping_method.to_string(),
        totals,
        schemata: target.schemata.iter().map(|s| resolver.schema(s)).collect(),
        migration_issues: resolver.issues([&state.migration_log, &state.object_migration_log]),
        creation_issues: resolver.issues([&state.creation_log]),
        data_copy: resolver.issues([&state.data_transfer_log]),
    })
}
