//! Source catalog input.
//!
//! The reverse-engineering step happens outside this crate. Its result is
//! handed over as a [`CatalogDocument`] (YAML or JSON) in which tables,
//! columns and keys refer to each other by name. [`CatalogDocument::into_catalog`]
//! assigns object ids and resolves every name into an id reference.

mod types;

pub use types::*;

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::core::rdbms::Rdbms;
use crate::core::schema::{
    Catalog, Column, DatatypeRef, ForeignKey, ForeignKeyRule, Index, IndexColumn, ObjectId,
    Routine, Schema, Table, Trigger, UserDatatype, View,
};
use crate::core::version::Version;
use crate::error::{MigrateError, Result};

impl CatalogDocument {
    /// Load a document from a file; `.json` files are read as JSON,
    /// everything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the id-referenced catalog.
    pub fn into_catalog(self) -> Result<Catalog> {
        Builder::default().catalog(self)
    }
}

/// Load and convert a catalog document in one step.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path = path.as_ref();
    info!("Loading source catalog from {}", path.display());
    CatalogDocument::load(path)?.into_catalog()
}

/// Foreign keys wait until every table has an id.
struct PendingForeignKeys {
    schema: usize,
    table: usize,
    keys: Vec<ForeignKeyDocument>,
}

#[derive(Default)]
struct Builder {
    next_id: u32,
    /// (schema, table) lowercased → table id
    tables: HashMap<(String, String), ObjectId>,
    user_types: Vec<String>,
}

impl Builder {
    fn id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    fn catalog(mut self, doc: CatalogDocument) -> Result<Catalog> {
        let mut catalog = Catalog::new(self.id(), doc.name);
        catalog.version = match doc.version.as_deref() {
            Some(text) => Version::parse(text).ok_or_else(|| {
                MigrateError::Config(format!("invalid source version '{}'", text))
            })?,
            None => Version::new(0, 0, -1),
        };
        if let Some(name) = doc.rdbms.as_deref() {
            let rdbms = Rdbms::builtin(name)
                .ok_or_else(|| MigrateError::Config(format!("unknown source rdbms '{}'", name)))?;
            catalog.simple_datatypes = rdbms.simple_datatypes;
        }

        for user_type in doc.user_types {
            self.user_types.push(user_type.name.clone());
            catalog.user_datatypes.push(UserDatatype {
                id: self.id(),
                owner: catalog.id,
                name: user_type.name,
                actual_type: user_type.actual_type,
                character_maximum_length: user_type.max_length,
                numeric_precision: user_type.precision,
                numeric_scale: user_type.scale,
                is_nullable: user_type.is_nullable,
                flags: user_type.flags,
            });
        }

        let mut pending = Vec::new();
        for (schema_pos, schema_doc) in doc.schemata.into_iter().enumerate() {
            let schema = self.schema(catalog.id, schema_doc, schema_pos, &mut pending)?;
            catalog.schemata.push(schema);
        }

        for PendingForeignKeys { schema, table, keys } in pending {
            let schema_name = catalog.schemata[schema].name.clone();
            let mut resolved = Vec::with_capacity(keys.len());
            for key in keys {
                resolved.push(self.foreign_key(&catalog, &schema_name, schema, table, key)?);
            }
            catalog.schemata[schema].tables[table].foreign_keys = resolved;
        }

        info!(
            "Source catalog {} has {} schema(s) and {} objects",
            catalog.name,
            catalog.schemata.len(),
            self.next_id
        );
        Ok(catalog)
    }

    fn schema(
        &mut self,
        owner: ObjectId,
        doc: SchemaDocument,
        schema_pos: usize,
        pending: &mut Vec<PendingForeignKeys>,
    ) -> Result<Schema> {
        let mut schema = Schema::new(self.id(), owner, doc.name);
        schema.comment = doc.comment;
        schema.default_character_set_name = doc.character_set;
        schema.default_collation_name = doc.collation;

        for (table_pos, mut table_doc) in doc.tables.into_iter().enumerate() {
            let keys = std::mem::take(&mut table_doc.foreign_keys);
            let table = self.table(schema.id, &schema.name, table_doc)?;
            self.tables.insert(
                (schema.name.to_lowercase(), table.name.to_lowercase()),
                table.id,
            );
            if !keys.is_empty() {
                pending.push(PendingForeignKeys {
                    schema: schema_pos,
                    table: table_pos,
                    keys,
                });
            }
            schema.tables.push(table);
        }

        for view in doc.views {
            schema.views.push(View {
                id: self.id(),
                owner: schema.id,
                name: view.name,
                sql_definition: view.definition,
                ..Default::default()
            });
        }
        for routine in doc.routines {
            schema.routines.push(Routine {
                id: self.id(),
                owner: schema.id,
                name: routine.name,
                routine_type: routine.routine_type,
                sql_definition: routine.definition,
                ..Default::default()
            });
        }
        Ok(schema)
    }

    fn table(&mut self, owner: ObjectId, schema_name: &str, doc: TableDocument) -> Result<Table> {
        let mut table = Table::new(self.id(), owner, doc.name);
        table.comment = doc.comment;
        table.default_character_set_name = doc.character_set;
        table.default_collation_name = doc.collation;
        table.options = doc.options;

        for column in doc.columns {
            let column = self.column(table.id, column);
            table.columns.push(column);
        }
        debug!("Loaded table {}.{} ({} columns)", schema_name, table.name, table.columns.len());

        if !doc.primary_key.is_empty() {
            let columns = doc
                .primary_key
                .iter()
                .map(|name| {
                    Ok(IndexColumn {
                        id: self.id(),
                        column: column_id(&table, schema_name, name)?,
                        column_length: 0,
                        descend: false,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let index = Index {
                id: self.id(),
                owner: table.id,
                name: doc.primary_key_name.unwrap_or_else(|| "PRIMARY".to_string()),
                is_primary: true,
                unique: true,
                index_type: "PRIMARY".to_string(),
                columns,
                ..Default::default()
            };
            table.primary_key = Some(index.id);
            table.indices.push(index);
        }

        for index_doc in doc.indexes {
            let mut columns = Vec::with_capacity(index_doc.columns.len());
            for column in &index_doc.columns {
                let (length, descend) = match column {
                    IndexColumnDocument::Name(_) => (0, false),
                    IndexColumnDocument::Detailed { length, descending, .. } => (*length, *descending),
                };
                columns.push(IndexColumn {
                    id: self.id(),
                    column: column_id(&table, schema_name, column.name())?,
                    column_length: length,
                    descend,
                });
            }
            let index_type = if index_doc.index_type.is_empty() {
                if index_doc.is_unique { "UNIQUE" } else { "INDEX" }.to_string()
            } else {
                index_doc.index_type.to_ascii_uppercase()
            };
            table.indices.push(Index {
                id: self.id(),
                owner: table.id,
                name: index_doc.name,
                comment: index_doc.comment,
                unique: index_doc.is_unique,
                clustered: index_doc.is_clustered,
                index_type,
                columns,
                ..Default::default()
            });
        }

        for trigger in doc.triggers {
            table.triggers.push(Trigger {
                id: self.id(),
                owner: table.id,
                name: trigger.name,
                event: trigger.event.to_ascii_uppercase(),
                timing: trigger.timing.to_ascii_uppercase(),
                sql_definition: trigger.definition,
                ..Default::default()
            });
        }
        Ok(table)
    }

    fn column(&mut self, owner: ObjectId, doc: ColumnDocument) -> Column {
        let formatted_raw_type = if doc.raw_type.is_empty() {
            raw_type(&doc)
        } else {
            doc.raw_type.clone()
        };
        let mut column = Column::new(self.id(), owner, doc.name);
        column.formatted_raw_type = formatted_raw_type;
        column.datatype = Some(
            match self
                .user_types
                .iter()
                .find(|name| name.eq_ignore_ascii_case(&doc.data_type))
            {
                Some(name) => DatatypeRef::User(name.clone()),
                None => DatatypeRef::Simple(doc.data_type.to_ascii_uppercase()),
            },
        );
        column.length = doc.max_length;
        column.precision = doc.precision;
        column.scale = doc.scale;
        column.datatype_explicit_params = doc.explicit_params;
        column.is_not_null = !doc.is_nullable;
        column.default_value = doc.default_value.unwrap_or_default();
        column.default_value_is_null = doc.default_is_null;
        column.identity = doc.is_identity;
        column.auto_increment = doc.auto_increment;
        if let Some(expression) = doc.generated {
            column.generated = true;
            column.expression = expression;
            column.generated_storage = doc.generated_storage.to_ascii_uppercase();
        }
        column.flags = doc.flags;
        column.character_set_name = doc.character_set;
        column.collation_name = doc.collation;
        column.comment = doc.comment;
        column
    }

    fn foreign_key(
        &mut self,
        catalog: &Catalog,
        schema_name: &str,
        schema: usize,
        table: usize,
        doc: ForeignKeyDocument,
    ) -> Result<ForeignKey> {
        let owner = &catalog.schemata[schema].tables[table];
        let ref_schema = doc.ref_schema.as_deref().unwrap_or(schema_name);
        let referenced_id = self
            .tables
            .get(&(ref_schema.to_lowercase(), doc.ref_table.to_lowercase()))
            .copied()
            .ok_or_else(|| {
                MigrateError::contract(format!(
                    "foreign key {} on {}.{} references unknown table {}.{}",
                    doc.name, schema_name, owner.name, ref_schema, doc.ref_table
                ))
            })?;
        let referenced = catalog
            .table(referenced_id)
            .map(|(_, t)| t)
            .ok_or_else(|| MigrateError::contract(format!("table {} not found", referenced_id)))?;

        let columns = doc
            .columns
            .iter()
            .map(|name| column_id(owner, schema_name, name))
            .collect::<Result<Vec<_>>>()?;
        let referenced_columns = doc
            .ref_columns
            .iter()
            .map(|name| column_id(referenced, ref_schema, name))
            .collect::<Result<Vec<_>>>()?;
        if columns.len() != referenced_columns.len() {
            return Err(MigrateError::contract(format!(
                "foreign key {} on {}.{} has {} column(s) but references {}",
                doc.name,
                schema_name,
                owner.name,
                columns.len(),
                referenced_columns.len()
            )));
        }

        Ok(ForeignKey {
            id: self.id(),
            owner: owner.id,
            name: doc.name,
            comment: doc.comment,
            columns,
            referenced_table: referenced_id,
            referenced_columns,
            update_rule: rule(&doc.on_update)?,
            delete_rule: rule(&doc.on_delete)?,
            model_only: doc.model_only,
            ..Default::default()
        })
    }
}

fn column_id(table: &Table, schema_name: &str, name: &str) -> Result<ObjectId> {
    table
        .find_column(name)
        .map(|c| c.id)
        .ok_or_else(|| {
            MigrateError::contract(format!(
                "column {} not found in table {}.{}",
                name, schema_name, table.name
            ))
        })
}

fn rule(text: &str) -> Result<ForeignKeyRule> {
    ForeignKeyRule::parse(text)
        .ok_or_else(|| MigrateError::contract(format!("unknown foreign key rule '{}'", text)))
}

/// Type text as a source server would print it.
fn raw_type(doc: &ColumnDocument) -> String {
    let name = doc.data_type.to_ascii_uppercase();
    if !doc.explicit_params.is_empty() {
        format!("{}{}", name, doc.explicit_params)
    } else if doc.max_length == -1 && matches!(name.as_str(), "VARCHAR" | "NVARCHAR" | "VARBINARY") {
        format!("{}(MAX)", name)
    } else if doc.max_length > 0 {
        format!("{}({})", name, doc.max_length)
    } else if doc.precision > 0 && doc.scale > 0 {
        format!("{}({},{})", name, doc.precision, doc.scale)
    } else if doc.precision > 0 {
        format!("{}({})", name, doc.precision)
    } else {
        name
    }
}
