//! Structural invariant checks over a catalog.
//!
//! Used on source catalogs before a run (`check` command) and on the target
//! catalog after the planner has reshaped it.

use std::collections::HashSet;
use std::fmt;

use super::lookup::CatalogIndex;
use super::schema::{Catalog, DatatypeRef, ObjectId, Table};
use crate::error::{MigrateError, Result};

/// Which optional invariants to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Sibling names must be unique (case-insensitive).
    pub unique_names: bool,
    /// Every column must carry a datatype.
    pub typed_columns: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            unique_names: true,
            typed_columns: true,
        }
    }
}

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub object: Option<ObjectId>,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object {
            Some(id) => write!(f, "{}: {}", id, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Collect every invariant violation in `catalog`.
pub fn check_catalog(catalog: &Catalog, options: ValidationOptions) -> Vec<Violation> {
    let index = CatalogIndex::build(catalog);
    let mut out = Vec::new();

    for id in index.duplicate_ids() {
        out.push(violation(*id, "object id is used more than once"));
    }

    for user_type in &catalog.user_datatypes {
        if user_type.owner != catalog.id {
            out.push(violation(user_type.id, "user datatype owner is not the catalog"));
        }
    }

    if options.unique_names {
        check_unique(&mut out, catalog.schemata.iter().map(|s| (s.id, s.name.as_str())), "schema");
    }

    for schema in &catalog.schemata {
        if schema.owner != catalog.id {
            out.push(violation(schema.id, format!("schema '{}' owner is not the catalog", schema.name)));
        }
        for view in &schema.views {
            if view.owner != schema.id {
                out.push(violation(view.id, format!("view '{}' owner mismatch", view.name)));
            }
        }
        for routine in &schema.routines {
            if routine.owner != schema.id {
                out.push(violation(routine.id, format!("routine '{}' owner mismatch", routine.name)));
            }
        }
        for group in &schema.routine_groups {
            if group.owner != schema.id {
                out.push(violation(group.id, format!("routine group '{}' owner mismatch", group.name)));
            }
        }
        if options.unique_names {
            check_unique(&mut out, schema.tables.iter().map(|t| (t.id, t.name.as_str())), "table");
        }

        for table in &schema.tables {
            if table.owner != schema.id {
                out.push(violation(table.id, format!("table '{}' owner mismatch", table.name)));
            }
            check_table(&mut out, catalog, &index, table, options);
        }
    }

    out
}

/// Fail with a structural error listing every violation.
pub fn validate_catalog(catalog: &Catalog, options: ValidationOptions) -> Result<()> {
    let violations = check_catalog(catalog, options);
    if violations.is_empty() {
        return Ok(());
    }
    let listed: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
    Err(MigrateError::structural(format!(
        "catalog '{}' violates {} invariant(s): {}",
        catalog.name,
        violations.len(),
        listed.join("; ")
    )))
}

fn check_table(
    out: &mut Vec<Violation>,
    catalog: &Catalog,
    index: &CatalogIndex,
    table: &Table,
    options: ValidationOptions,
) {
    for column in &table.columns {
        if column.owner != table.id {
            out.push(violation(column.id, format!("column '{}' owner mismatch", column.name)));
        }
        match &column.datatype {
            Some(DatatypeRef::Simple(name)) if catalog.simple_type(name).is_none() => {
                out.push(violation(
                    column.id,
                    format!("column '{}.{}' uses unregistered type '{}'", table.name, column.name, name),
                ));
            }
            Some(DatatypeRef::User(name)) if catalog.user_type(name).is_none() => {
                out.push(violation(
                    column.id,
                    format!("column '{}.{}' uses unknown user type '{}'", table.name, column.name, name),
                ));
            }
            None if options.typed_columns => {
                out.push(violation(
                    column.id,
                    format!("column '{}.{}' has no datatype", table.name, column.name),
                ));
            }
            _ => {}
        }
    }

    for idx in &table.indices {
        if idx.owner != table.id {
            out.push(violation(idx.id, format!("index '{}' owner mismatch", idx.name)));
        }
        for ic in &idx.columns {
            if table.column(ic.column).is_none() {
                out.push(violation(
                    idx.id,
                    format!("index '{}.{}' references a column outside its table", table.name, idx.name),
                ));
            }
        }
    }

    if let Some(pk) = table.primary_key {
        if table.index(pk).is_none() {
            out.push(violation(table.id, format!("primary key of '{}' is not one of its indices", table.name)));
        }
    }

    for fk in &table.foreign_keys {
        if fk.owner != table.id {
            out.push(violation(fk.id, format!("foreign key '{}' owner mismatch", fk.name)));
        }
        if fk.columns.len() != fk.referenced_columns.len() {
            out.push(violation(
                fk.id,
                format!(
                    "foreign key '{}.{}' has {} column(s) but {} referenced column(s)",
                    table.name,
                    fk.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                ),
            ));
        }
        if fk.columns.iter().any(|c| table.column(*c).is_none()) {
            out.push(violation(
                fk.id,
                format!("foreign key '{}.{}' uses a column outside its table", table.name, fk.name),
            ));
        }
        match index.table(catalog, fk.referenced_table) {
            Some(referenced) => {
                if fk.referenced_columns.iter().any(|c| referenced.column(*c).is_none()) {
                    out.push(violation(
                        fk.id,
                        format!(
                            "foreign key '{}.{}' references a column not in '{}'",
                            table.name, fk.name, referenced.name
                        ),
                    ));
                }
            }
            None => out.push(violation(
                fk.id,
                format!("foreign key '{}.{}' references an unknown table", table.name, fk.name),
            )),
        }
    }

    for trigger in &table.triggers {
        if trigger.owner != table.id {
            out.push(violation(trigger.id, format!("trigger '{}' owner mismatch", trigger.name)));
        }
    }

    if options.unique_names {
        check_unique(out, table.columns.iter().map(|c| (c.id, c.name.as_str())), "column");
        check_unique(out, table.indices.iter().map(|i| (i.id, i.name.as_str())), "index");
        check_unique(out, table.foreign_keys.iter().map(|f| (f.id, f.name.as_str())), "foreign key");
    }
}

fn check_unique<'a>(
    out: &mut Vec<Violation>,
    names: impl Iterator<Item = (ObjectId, &'a str)>,
    what: &str,
) {
    let mut seen = HashSet::new();
    for (id, name) in names {
        if !seen.insert(name.to_lowercase()) {
            out.push(violation(id, format!("duplicate {} name '{}'", what, name)));
        }
    }
}

fn violation(id: ObjectId, message: impl Into<String>) -> Violation {
    Violation {
        object: Some(id),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rdbms::Rdbms;
    use crate::core::schema::{Column, ForeignKey, Index, IndexColumn, Schema};

    fn valid_catalog() -> Catalog {
        let mut catalog = Catalog::new(ObjectId(1), "db");
        catalog.simple_datatypes = Rdbms::mysql().simple_datatypes;
        let mut schema = Schema::new(ObjectId(2), ObjectId(1), "s");

        let mut parent = Table::new(ObjectId(3), ObjectId(2), "parent");
        let mut id = Column::new(ObjectId(4), ObjectId(3), "id");
        id.datatype = Some(DatatypeRef::Simple("INT".into()));
        parent.columns.push(id);
        parent.indices.push(Index {
            id: ObjectId(5),
            owner: ObjectId(3),
            name: "PRIMARY".into(),
            is_primary: true,
            columns: vec![IndexColumn { id: ObjectId(6), column: ObjectId(4), ..Default::default() }],
            ..Default::default()
        });
        parent.primary_key = Some(ObjectId(5));

        let mut child = Table::new(ObjectId(7), ObjectId(2), "child");
        let mut pid = Column::new(ObjectId(8), ObjectId(7), "parent_id");
        pid.datatype = Some(DatatypeRef::Simple("int".into()));
        child.columns.push(pid);
        child.foreign_keys.push(ForeignKey {
            id: ObjectId(9),
            owner: ObjectId(7),
            name: "fk_child_parent".into(),
            columns: vec![ObjectId(8)],
            referenced_table: ObjectId(3),
            referenced_columns: vec![ObjectId(4)],
            ..Default::default()
        });

        schema.tables.push(parent);
        schema.tables.push(child);
        catalog.schemata.push(schema);
        catalog
    }

    #[test]
    fn test_valid_catalog_passes() {
        let catalog = valid_catalog();
        assert!(check_catalog(&catalog, ValidationOptions::default()).is_empty());
        assert!(validate_catalog(&catalog, ValidationOptions::default()).is_ok());
    }

    #[test]
    fn test_fk_arity_and_target_checked() {
        let mut catalog = valid_catalog();
        let fk = &mut catalog.schemata[0].tables[1].foreign_keys[0];
        fk.referenced_columns.clear();
        fk.referenced_table = ObjectId(99);

        let violations = check_catalog(&catalog, ValidationOptions::default());
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("0 referenced column"));
        assert!(violations[1].message.contains("unknown table"));
    }

    #[test]
    fn test_fk_referenced_column_must_belong_to_referenced_table() {
        let mut catalog = valid_catalog();
        catalog.schemata[0].tables[1].foreign_keys[0].referenced_columns = vec![ObjectId(8)];
        let violations = check_catalog(&catalog, ValidationOptions::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("not in 'parent'"));
    }

    #[test]
    fn test_duplicate_names_respect_option() {
        let mut catalog = valid_catalog();
        catalog.schemata[0].tables[1].name = "PARENT".into();

        let violations = check_catalog(&catalog, ValidationOptions::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("duplicate table name"));

        let relaxed = ValidationOptions { unique_names: false, ..Default::default() };
        assert!(check_catalog(&catalog, relaxed).is_empty());
    }

    #[test]
    fn test_untyped_and_unregistered_columns() {
        let mut catalog = valid_catalog();
        catalog.schemata[0].tables[0].columns[0].datatype = None;
        catalog.schemata[0].tables[1].columns[0].datatype = Some(DatatypeRef::Simple("MONEY".into()));

        let violations = check_catalog(&catalog, ValidationOptions::default());
        assert_eq!(violations.len(), 2);

        let lenient = ValidationOptions { typed_columns: false, ..Default::default() };
        let violations = check_catalog(&catalog, lenient);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("MONEY"));
    }

    #[test]
    fn test_owner_mismatch_and_index_column() {
        let mut catalog = valid_catalog();
        catalog.schemata[0].tables[0].columns[0].owner = ObjectId(7);
        catalog.schemata[0].tables[0].indices[0].columns[0].column = ObjectId(8);

        let err = validate_catalog(&catalog, ValidationOptions::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("column 'id' owner mismatch"));
        assert!(msg.contains("outside its table"));
    }
}
