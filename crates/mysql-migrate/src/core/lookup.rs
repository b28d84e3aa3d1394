//! Id → location index over a catalog.
//!
//! The model stores cross references as ids; [`CatalogIndex`] turns an id
//! back into the path of the entity so callers can fetch it or print its
//! qualified name. The index is a snapshot: rebuild it after the catalog is
//! reshaped.

use std::collections::HashMap;

use super::schema::{Catalog, Column, ObjectId, ObjectKind, Schema, Table};

/// Position of an entity inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Catalog,
    UserDatatype { index: usize },
    Schema { schema: usize },
    Table { schema: usize, table: usize },
    Column { schema: usize, table: usize, column: usize },
    Index { schema: usize, table: usize, index: usize },
    ForeignKey { schema: usize, table: usize, foreign_key: usize },
    Trigger { schema: usize, table: usize, trigger: usize },
    View { schema: usize, view: usize },
    Routine { schema: usize, routine: usize },
    RoutineGroup { schema: usize, group: usize },
}

impl Location {
    pub fn kind(self) -> ObjectKind {
        match self {
            Location::Catalog => ObjectKind::Catalog,
            Location::UserDatatype { .. } => ObjectKind::UserDatatype,
            Location::Schema { .. } => ObjectKind::Schema,
            Location::Table { .. } => ObjectKind::Table,
            Location::Column { .. } => ObjectKind::Column,
            Location::Index { .. } => ObjectKind::Index,
            Location::ForeignKey { .. } => ObjectKind::ForeignKey,
            Location::Trigger { .. } => ObjectKind::Trigger,
            Location::View { .. } => ObjectKind::View,
            Location::Routine { .. } => ObjectKind::Routine,
            Location::RoutineGroup { .. } => ObjectKind::RoutineGroup,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    locations: HashMap<ObjectId, Location>,
    duplicates: Vec<ObjectId>,
}

impl CatalogIndex {
    pub fn build(catalog: &Catalog) -> Self {
        let mut index = CatalogIndex::default();
        index.insert(catalog.id, Location::Catalog);

        for (i, user_type) in catalog.user_datatypes.iter().enumerate() {
            index.insert(user_type.id, Location::UserDatatype { index: i });
        }

        for (s, schema) in catalog.schemata.iter().enumerate() {
            index.insert(schema.id, Location::Schema { schema: s });

            for (t, table) in schema.tables.iter().enumerate() {
                index.insert(table.id, Location::Table { schema: s, table: t });
                for (c, column) in table.columns.iter().enumerate() {
                    index.insert(column.id, Location::Column { schema: s, table: t, column: c });
                }
                for (i, idx) in table.indices.iter().enumerate() {
                    index.insert(idx.id, Location::Index { schema: s, table: t, index: i });
                }
                for (f, fk) in table.foreign_keys.iter().enumerate() {
                    index.insert(fk.id, Location::ForeignKey { schema: s, table: t, foreign_key: f });
                }
                for (g, trigger) in table.triggers.iter().enumerate() {
                    index.insert(trigger.id, Location::Trigger { schema: s, table: t, trigger: g });
                }
            }
            for (v, view) in schema.views.iter().enumerate() {
                index.insert(view.id, Location::View { schema: s, view: v });
            }
            for (r, routine) in schema.routines.iter().enumerate() {
                index.insert(routine.id, Location::Routine { schema: s, routine: r });
            }
            for (g, group) in schema.routine_groups.iter().enumerate() {
                index.insert(group.id, Location::RoutineGroup { schema: s, group: g });
            }
        }

        index
    }

    fn insert(&mut self, id: ObjectId, location: Location) {
        if self.locations.insert(id, location).is_some() {
            self.duplicates.push(id);
        }
    }

    pub fn locate(&self, id: ObjectId) -> Option<Location> {
        self.locations.get(&id).copied()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Ids that were seen more than once while building.
    pub fn duplicate_ids(&self) -> &[ObjectId] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn schema<'c>(&self, catalog: &'c Catalog, id: ObjectId) -> Option<&'c Schema> {
        match self.locate(id)? {
            Location::Schema { schema } => catalog.schemata.get(schema),
            _ => None,
        }
    }

    pub fn table<'c>(&self, catalog: &'c Catalog, id: ObjectId) -> Option<&'c Table> {
        match self.locate(id)? {
            Location::Table { schema, table } => catalog.schemata.get(schema)?.tables.get(table),
            _ => None,
        }
    }

    pub fn column<'c>(&self, catalog: &'c Catalog, id: ObjectId) -> Option<&'c Column> {
        match self.locate(id)? {
            Location::Column { schema, table, column } => catalog
                .schemata
                .get(schema)?
                .tables
                .get(table)?
                .columns
                .get(column),
            _ => None,
        }
    }

    /// Table that owns a column, index, foreign key or trigger.
    pub fn owning_table<'c>(&self, catalog: &'c Catalog, id: ObjectId) -> Option<&'c Table> {
        let (schema, table) = match self.locate(id)? {
            Location::Table { schema, table }
            | Location::Column { schema, table, .. }
            | Location::Index { schema, table, .. }
            | Location::ForeignKey { schema, table, .. }
            | Location::Trigger { schema, table, .. } => (schema, table),
            _ => return None,
        };
        catalog.schemata.get(schema)?.tables.get(table)
    }

    /// Dotted, unquoted name of an entity: `schema.table.column`,
    /// `schema.view`, or just the name for catalogs and schemas.
    pub fn qualified_name(&self, catalog: &Catalog, id: ObjectId) -> Option<String> {
        let name = match self.locate(id)? {
            Location::Catalog => catalog.name.clone(),
            Location::UserDatatype { index } => catalog.user_datatypes.get(index)?.name.clone(),
            Location::Schema { schema } => catalog.schemata.get(schema)?.name.clone(),
            Location::Table { schema, table } => {
                let s = catalog.schemata.get(schema)?;
                format!("{}.{}", s.name, s.tables.get(table)?.name)
            }
            Location::Column { schema, table, column } => {
                let s = catalog.schemata.get(schema)?;
                let t = s.tables.get(table)?;
                format!("{}.{}.{}", s.name, t.name, t.columns.get(column)?.name)
            }
            Location::Index { schema, table, index } => {
                let s = catalog.schemata.get(schema)?;
                let t = s.tables.get(table)?;
                format!("{}.{}.{}", s.name, t.name, t.indices.get(index)?.name)
            }
            Location::ForeignKey { schema, table, foreign_key } => {
                let s = catalog.schemata.get(schema)?;
                let t = s.tables.get(table)?;
                format!("{}.{}.{}", s.name, t.name, t.foreign_keys.get(foreign_key)?.name)
            }
            Location::Trigger { schema, table, trigger } => {
                let s = catalog.schemata.get(schema)?;
                let t = s.tables.get(table)?;
                format!("{}.{}.{}", s.name, t.name, t.triggers.get(trigger)?.name)
            }
            Location::View { schema, view } => {
                let s = catalog.schemata.get(schema)?;
                format!("{}.{}", s.name, s.views.get(view)?.name)
            }
            Location::Routine { schema, routine } => {
                let s = catalog.schemata.get(schema)?;
                format!("{}.{}", s.name, s.routines.get(routine)?.name)
            }
            Location::RoutineGroup { schema, group } => {
                let s = catalog.schemata.get(schema)?;
                format!("{}.{}", s.name, s.routine_groups.get(group)?.name)
            }
        };
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, View};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new(ObjectId(1), "db");
        let mut schema = Schema::new(ObjectId(2), ObjectId(1), "sales");
        let mut table = Table::new(ObjectId(3), ObjectId(2), "orders");
        table.columns.push(Column::new(ObjectId(4), ObjectId(3), "id"));
        schema.tables.push(table);
        schema.views.push(View {
            id: ObjectId(5),
            owner: ObjectId(2),
            name: "recent".into(),
            ..Default::default()
        });
        catalog.schemata.push(schema);
        catalog
    }

    #[test]
    fn test_locate_and_fetch() {
        let catalog = catalog();
        let index = CatalogIndex::build(&catalog);

        assert_eq!(index.len(), 5);
        assert_eq!(index.locate(ObjectId(3)), Some(Location::Table { schema: 0, table: 0 }));
        assert_eq!(index.column(&catalog, ObjectId(4)).unwrap().name, "id");
        assert_eq!(index.owning_table(&catalog, ObjectId(4)).unwrap().name, "orders");
        assert!(index.table(&catalog, ObjectId(4)).is_none());
        assert_eq!(index.locate(ObjectId(5)).unwrap().kind(), ObjectKind::View);
    }

    #[test]
    fn test_qualified_names() {
        let catalog = catalog();
        let index = CatalogIndex::build(&catalog);
        assert_eq!(index.qualified_name(&catalog, ObjectId(2)).unwrap(), "sales");
        assert_eq!(index.qualified_name(&catalog, ObjectId(4)).unwrap(), "sales.orders.id");
        assert_eq!(index.qualified_name(&catalog, ObjectId(5)).unwrap(), "sales.recent");
        assert!(index.qualified_name(&catalog, ObjectId(42)).is_none());
    }

    #[test]
    fn test_duplicate_ids_recorded() {
        let mut catalog = catalog();
        catalog.schemata[0].tables[0]
            .columns
            .push(Column::new(ObjectId(4), ObjectId(3), "dup"));
        let index = CatalogIndex::build(&catalog);
        assert_eq!(index.duplicate_ids(), &[ObjectId(4)]);
    }
}
