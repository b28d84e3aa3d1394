//! Schema-mapping planner.
//!
//! Runs on the target catalog after the object transformer and before the
//! emitter. Depending on the [`SchemaMappingMethod`] it keeps the schema
//! layout, folds every schema into the first one, or folds them with a
//! `<schema>_` prefix. A uniqueness pass then guarantees that every sibling
//! set holds distinct names that MySQL accepts.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::identifier::{truncate_identifier, with_suffix, MAX_IDENTIFIER_LENGTH};
use crate::core::schema::{
    Catalog, Column, Entity, ForeignKey, Index, ObjectId, ObjectKind, Routine, RoutineGroup,
    Schema, Table, Trigger, View,
};
use crate::core::traits::SCHEMA_MAPPING_METHOD;
use crate::error::{MigrateError, Result};
use crate::state::{MigrationLog, MigrationState, ObjectRef, Severity};

/// How source schemas are laid out in the target catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMappingMethod {
    /// One target schema per source schema.
    #[default]
    KeepSchemas,
    /// Everything moves into the first schema; conflicts get a `_<schema>` suffix.
    DropCatalog,
    /// Everything moves into the first schema with a `<schema>_` prefix.
    MergeWithPrefix,
}

impl SchemaMappingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaMappingMethod::KeepSchemas => "keep_schemas",
            SchemaMappingMethod::DropCatalog => "drop_catalog",
            SchemaMappingMethod::MergeWithPrefix => "merge_with_prefix",
        }
    }

    /// Method selected by the state's migration options.
    pub fn from_state(state: &MigrationState) -> Result<Self> {
        match state.option(SCHEMA_MAPPING_METHOD) {
            Some(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }
}

impl fmt::Display for SchemaMappingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaMappingMethod {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "keep_schemas" => Ok(SchemaMappingMethod::KeepSchemas),
            "drop_catalog" => Ok(SchemaMappingMethod::DropCatalog),
            "merge_with_prefix" => Ok(SchemaMappingMethod::MergeWithPrefix),
            _ => Err(MigrateError::Config(format!(
                "schemaMappingMethod must be one of [keep_schemas, drop_catalog, merge_with_prefix], got '{}'",
                s
            ))),
        }
    }
}

/// Entities whose name the planner may change.
trait Renamable: Entity {
    fn set_name(&mut self, name: String);
}

macro_rules! impl_renamable {
    ($($ty:ty),*) => {
        $(impl Renamable for $ty {
            fn set_name(&mut self, name: String) {
                self.name = name;
            }
        })*
    };
}

impl_renamable!(Schema, Table, View, Routine, RoutineGroup, Column, Index, ForeignKey, Trigger);

/// Names already taken in one namespace, compared case-insensitively.
#[derive(Default)]
struct Namespace(HashSet<String>);

impl Namespace {
    fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_lowercase())
    }

    fn claim(&mut self, name: &str) {
        self.0.insert(name.to_lowercase());
    }
}

/// Tables and views share one namespace in MySQL; routines have their own.
#[derive(Default)]
struct SchemaNamespaces {
    relations: Namespace,
    routines: Namespace,
    routine_groups: Namespace,
}

impl SchemaNamespaces {
    fn for_kind(&mut self, kind: ObjectKind) -> &mut Namespace {
        match kind {
            ObjectKind::Routine => &mut self.routines,
            ObjectKind::RoutineGroup => &mut self.routine_groups,
            _ => &mut self.relations,
        }
    }
}

/// Restructures the target catalog of a migration state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaPlanner {
    method: SchemaMappingMethod,
}

impl SchemaPlanner {
    pub fn new(method: SchemaMappingMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> SchemaMappingMethod {
        self.method
    }

    /// Apply the mapping method and the uniqueness pass to the target
    /// catalog. Messages go to the object migration log. Running the
    /// planner a second time changes nothing.
    pub fn plan(&self, state: &mut MigrationState) -> Result<()> {
        let mut catalog = state.target_catalog.take().ok_or_else(|| {
            MigrateError::contract("schema planning needs a migrated target catalog")
        })?;

        info!(
            "Planning schemas of catalog {} with {}",
            catalog.name, self.method
        );
        match self.method {
            SchemaMappingMethod::KeepSchemas => {}
            SchemaMappingMethod::DropCatalog => merge_schemas(state, &mut catalog, false),
            SchemaMappingMethod::MergeWithPrefix => merge_schemas(state, &mut catalog, true),
        }
        enforce_unique_names(state, &mut catalog);

        state.target_catalog = Some(catalog);
        Ok(())
    }
}

// =============================================================================
// Schema merging
// =============================================================================

fn merge_schemas(state: &mut MigrationState, catalog: &mut Catalog, prefix: bool) {
    if catalog.schemata.len() < 2 {
        debug!("Catalog {} has a single schema, nothing to merge", catalog.name);
        return;
    }

    let mut schemata = std::mem::take(&mut catalog.schemata).into_iter();
    let Some(mut merged) = schemata.next() else {
        return;
    };
    // The first schema is refilled through the same path as the others.
    let first = Schema {
        tables: std::mem::take(&mut merged.tables),
        views: std::mem::take(&mut merged.views),
        routines: std::mem::take(&mut merged.routines),
        routine_groups: std::mem::take(&mut merged.routine_groups),
        ..Schema::new(merged.id, merged.owner, merged.name.clone())
    };
    let mut names = SchemaNamespaces::default();

    absorb(&mut state.object_migration_log, &mut merged, &mut names, first, prefix, true);
    for schema in schemata {
        if schema.default_character_set_name != merged.default_character_set_name
            || schema.default_collation_name != merged.default_collation_name
        {
            state.object_migration_log.add(
                Severity::Note,
                None,
                Some(ObjectRef::of(&merged)),
                format!(
                    "Schema {} uses character set '{}' and collation '{}'. The merged schema keeps '{}' and '{}' from schema {}",
                    schema.name,
                    schema.default_character_set_name,
                    schema.default_collation_name,
                    merged.default_character_set_name,
                    merged.default_collation_name,
                    merged.name
                ),
            );
        }
        if let Some(source) = state.object_map.source_of(schema.id) {
            state.object_map.redirect(source, merged.id);
        }
        absorb(&mut state.object_migration_log, &mut merged, &mut names, schema, prefix, false);
    }

    info!(
        "Merged schemas into {} ({} tables, {} views, {} routines)",
        merged.name,
        merged.tables.len(),
        merged.views.len(),
        merged.routines.len()
    );
    catalog.schemata = vec![merged];
}

/// Move the contents of `from` into `merged`, renaming as the method asks.
fn absorb(
    log: &mut MigrationLog,
    merged: &mut Schema,
    names: &mut SchemaNamespaces,
    from: Schema,
    prefix: bool,
    is_first: bool,
) {
    let Schema {
        id,
        name,
        tables,
        views,
        routines,
        routine_groups,
        ..
    } = from;
    let owner = merged.id;
    let merged_name = merged.name.clone();
    let context = MergeSource {
        schema_id: id,
        schema_name: &name,
        merged_name: &merged_name,
        prefix,
        is_first,
    };

    for mut table in tables {
        context.place(log, names, &mut table);
        table.owner = owner;
        merged.tables.push(table);
    }
    for mut view in views {
        context.place(log, names, &mut view);
        view.owner = owner;
        merged.views.push(view);
    }
    for mut routine in routines {
        context.place(log, names, &mut routine);
        routine.owner = owner;
        merged.routines.push(routine);
    }
    for mut group in routine_groups {
        context.place(log, names, &mut group);
        group.owner = owner;
        merged.routine_groups.push(group);
    }
}

struct MergeSource<'a> {
    schema_id: ObjectId,
    schema_name: &'a str,
    merged_name: &'a str,
    prefix: bool,
    is_first: bool,
}

impl MergeSource<'_> {
    /// Give `object` its name in the merged schema and claim it.
    fn place(&self, log: &mut MigrationLog, names: &mut SchemaNamespaces, object: &mut impl Renamable) {
        let namespace = names.for_kind(object.kind());
        let old = object.name().to_string();

        let new = if self.prefix {
            let prefixed = format!("{}_{}", self.schema_name, old);
            if namespace.contains(&prefixed) {
                format!("{}_{}_{}", self.schema_name, self.schema_id.0, old)
            } else {
                prefixed
            }
        } else if !self.is_first && namespace.contains(&old) {
            with_suffix(&old, &format!("_{}", self.schema_name))
        } else {
            old.clone()
        };

        namespace.claim(&new);
        if new == old {
            return;
        }
        object.set_name(new.clone());
        log.add(
            Severity::Note,
            None,
            Some(ObjectRef::of(&*object)),
            format!(
                "Renamed {} {}.{} to {} while merging schema {} into {}",
                object.kind(),
                self.schema_name,
                old,
                new,
                self.schema_name,
                self.merged_name
            ),
        );
    }
}

// =============================================================================
// Uniqueness pass
// =============================================================================

fn enforce_unique_names(state: &mut MigrationState, catalog: &mut Catalog) {
    let mut schema_names = Namespace::default();
    for schema in &mut catalog.schemata {
        make_unique(state, &mut schema_names, schema);

        let mut names = SchemaNamespaces::default();
        let mut foreign_keys = Namespace::default();
        let mut triggers = Namespace::default();

        for table in &mut schema.tables {
            make_unique(state, &mut names.relations, table);

            let mut columns = Namespace::default();
            for column in &mut table.columns {
                make_unique(state, &mut columns, column);
            }
            let mut indices = Namespace::default();
            for index in &mut table.indices {
                make_unique(state, &mut indices, index);
            }
            for fk in &mut table.foreign_keys {
                make_unique(state, &mut foreign_keys, fk);
            }
            for trigger in &mut table.triggers {
                make_unique(state, &mut triggers, trigger);
            }
        }
        for view in &mut schema.views {
            make_unique(state, &mut names.relations, view);
        }
        for routine in &mut schema.routines {
            make_unique(state, &mut names.routines, routine);
        }
        for group in &mut schema.routine_groups {
            make_unique(state, &mut names.routine_groups, group);
        }
    }
}

/// Fill in empty names, truncate long ones and suffix duplicates.
fn make_unique(state: &mut MigrationState, namespace: &mut Namespace, object: &mut impl Renamable) {
    if object.name().is_empty() {
        let placeholder = format!("{}_{}", object.kind().label().replace(' ', "_"), object.id().0);
        object.set_name(placeholder.clone());
        warn_rename(
            &mut state.object_migration_log,
            &*object,
            format!("Empty {} name replaced by {}", object.kind(), placeholder),
        );
    }

    if object.name().chars().count() > MAX_IDENTIFIER_LENGTH {
        let old = object.name().to_string();
        if let Some(short) = truncate_identifier(&old, state.next_truncation_serial()) {
            object.set_name(short.clone());
            warn_rename(
                &mut state.object_migration_log,
                &*object,
                format!(
                    "Identifier {} is longer than 64 characters and was truncated to {}",
                    old, short
                ),
            );
        }
    }

    if namespace.contains(object.name()) {
        let old = object.name().to_string();
        let mut serial = 1;
        let mut candidate = with_suffix(&old, "_1");
        while namespace.contains(&candidate) {
            serial += 1;
            candidate = with_suffix(&old, &format!("_{}", serial));
        }
        object.set_name(candidate.clone());
        warn_rename(
            &mut state.object_migration_log,
            &*object,
            format!("Duplicate {} name {} renamed to {}", object.kind(), old, candidate),
        );
    }

    namespace.claim(object.name());
}

fn warn_rename(log: &mut MigrationLog, object: &impl Entity, message: String) {
    tracing::warn!("{}", message);
    log.add(Severity::Warning, None, Some(ObjectRef::of(object)), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ForeignKeyRule, Trigger};

    fn table(id: u32, owner: u32, name: &str) -> Table {
        let mut table = Table::new(ObjectId(id), ObjectId(owner), name);
        table
            .columns
            .push(Column::new(ObjectId(id + 500), ObjectId(id), "id"));
        table
    }

    fn schema(id: u32, name: &str, tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new(ObjectId(id), ObjectId(1), name);
        schema.default_character_set_name = "utf8".into();
        schema.default_collation_name = "utf8_general_ci".into();
        schema.tables = tables;
        schema
    }

    fn state_with(schemata: Vec<Schema>, method: SchemaMappingMethod) -> MigrationState {
        let mut catalog = Catalog::new(ObjectId(1), "def");
        catalog.schemata = schemata;
        let mut state = MigrationState::new();
        state
            .object_migration_params
            .insert(SCHEMA_MAPPING_METHOD.into(), method.as_str().into());
        state.target_catalog = Some(catalog);
        state
    }

    fn plan(state: &mut MigrationState) {
        let method = SchemaMappingMethod::from_state(state).unwrap();
        SchemaPlanner::new(method).plan(state).unwrap();
    }

    fn table_names(state: &MigrationState) -> Vec<Vec<String>> {
        state
            .target()
            .unwrap()
            .schemata
            .iter()
            .map(|s| s.tables.iter().map(|t| t.name.clone()).collect())
            .collect()
    }

    // =========================================================================
    // Method parsing
    // =========================================================================

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            "drop_catalog".parse::<SchemaMappingMethod>().unwrap(),
            SchemaMappingMethod::DropCatalog
        );
        assert_eq!(
            "Merge-With-Prefix".parse::<SchemaMappingMethod>().unwrap(),
            SchemaMappingMethod::MergeWithPrefix
        );
        assert!(matches!(
            "flatten".parse::<SchemaMappingMethod>(),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_method_defaults_to_keep() {
        let state = MigrationState::new();
        assert_eq!(
            SchemaMappingMethod::from_state(&state).unwrap(),
            SchemaMappingMethod::KeepSchemas
        );
    }

    #[test]
    fn test_plan_without_target_is_contract_error() {
        let mut state = MigrationState::new();
        let result = SchemaPlanner::default().plan(&mut state);
        assert!(matches!(result, Err(MigrateError::Contract(_))));
    }

    // =========================================================================
    // Policies
    // =========================================================================

    #[test]
    fn test_keep_schemas_is_noop() {
        let mut state = state_with(
            vec![
                schema(2, "S1", vec![table(10, 2, "T")]),
                schema(3, "S2", vec![table(20, 3, "T")]),
            ],
            SchemaMappingMethod::KeepSchemas,
        );
        plan(&mut state);
        assert_eq!(table_names(&state), vec![vec!["T"], vec!["T"]]);
        assert!(state.object_migration_log.is_empty());
    }

    #[test]
    fn test_merge_with_prefix() {
        let mut state = state_with(
            vec![
                schema(2, "S1", vec![table(10, 2, "T")]),
                schema(3, "S2", vec![table(20, 3, "T")]),
            ],
            SchemaMappingMethod::MergeWithPrefix,
        );
        plan(&mut state);

        let target = state.target().unwrap();
        assert_eq!(target.schemata.len(), 1);
        assert_eq!(table_names(&state), vec![vec!["S1_T", "S2_T"]]);
        assert!(target.schemata[0].tables.iter().all(|t| t.owner == ObjectId(2)));
        assert_eq!(state.object_migration_log.count(Severity::Note), 2);
        assert_eq!(state.object_migration_log.len(), 2);
        assert_eq!(
            state.object_migration_log.entries()[1].message,
            "Renamed table S2.T to S2_T while merging schema S2 into S1"
        );
    }

    #[test]
    fn test_merge_with_prefix_collision_uses_schema_id() {
        let mut state = state_with(
            vec![
                schema(2, "A", vec![table(10, 2, "B_C")]),
                schema(3, "A_B", vec![table(20, 3, "C")]),
            ],
            SchemaMappingMethod::MergeWithPrefix,
        );
        plan(&mut state);
        assert_eq!(table_names(&state), vec![vec!["A_B_C", "A_B_3_C"]]);
    }

    #[test]
    fn test_merge_with_prefix_single_schema_is_noop() {
        let mut state = state_with(
            vec![schema(2, "S1", vec![table(10, 2, "T")])],
            SchemaMappingMethod::MergeWithPrefix,
        );
        plan(&mut state);
        assert_eq!(table_names(&state), vec![vec!["T"]]);
        assert!(state.object_migration_log.is_empty());
    }

    #[test]
    fn test_drop_catalog_renames_conflicts() {
        let mut second = schema(3, "S2", vec![table(20, 3, "T"), table(21, 3, "U")]);
        second.default_collation_name = "latin1_swedish_ci".into();
        let mut state = state_with(
            vec![schema(2, "S1", vec![table(10, 2, "T")]), second],
            SchemaMappingMethod::DropCatalog,
        );
        plan(&mut state);

        assert_eq!(table_names(&state), vec![vec!["T", "T_S2", "U"]]);
        let target = state.target().unwrap();
        assert_eq!(target.schemata[0].default_collation_name, "utf8_general_ci");
        // one collation note, one rename note
        assert_eq!(state.object_migration_log.count(Severity::Note), 2);
    }

    #[test]
    fn test_drop_catalog_views_share_table_namespace() {
        let mut second = schema(3, "S2", vec![]);
        second.views.push(View {
            id: ObjectId(30),
            owner: ObjectId(3),
            name: "T".into(),
            ..Default::default()
        });
        let mut state = state_with(
            vec![schema(2, "S1", vec![table(10, 2, "T")]), second],
            SchemaMappingMethod::DropCatalog,
        );
        plan(&mut state);
        let merged = &state.target().unwrap().schemata[0];
        assert_eq!(merged.views[0].name, "T_S2");
        assert_eq!(merged.views[0].owner, ObjectId(2));
    }

    #[test]
    fn test_merge_redirects_object_map() {
        let mut state = state_with(
            vec![schema(2, "S1", vec![]), schema(3, "S2", vec![])],
            SchemaMappingMethod::DropCatalog,
        );
        state.object_map.insert(ObjectId(900), ObjectId(2));
        state.object_map.insert(ObjectId(901), ObjectId(3));
        plan(&mut state);
        assert_eq!(state.object_map.target_of(ObjectId(901)), Some(ObjectId(2)));
    }

    // =========================================================================
    // Uniqueness pass
    // =========================================================================

    #[test]
    fn test_long_names_are_truncated() {
        let long = "x".repeat(70);
        let mut state = state_with(
            vec![schema(2, "S1", vec![table(10, 2, &long)])],
            SchemaMappingMethod::KeepSchemas,
        );
        plan(&mut state);
        let name = &table_names(&state)[0][0];
        assert_eq!(name, &format!("{}1", "x".repeat(62)));
        assert_eq!(state.object_migration_log.count(Severity::Warning), 1);
    }

    #[test]
    fn test_foreign_key_and_trigger_names_unique_per_schema() {
        let fk = |id: u32, owner: u32| ForeignKey {
            id: ObjectId(id),
            owner: ObjectId(owner),
            name: "FK_Parent".into(),
            referenced_table: ObjectId(10),
            update_rule: ForeignKeyRule::NoAction,
            delete_rule: ForeignKeyRule::NoAction,
            ..Default::default()
        };
        let trigger = |id: u32, owner: u32| Trigger {
            id: ObjectId(id),
            owner: ObjectId(owner),
            name: "audit".into(),
            ..Default::default()
        };
        let mut a = table(11, 2, "A");
        a.foreign_keys.push(fk(40, 11));
        a.triggers.push(trigger(50, 11));
        let mut b = table(12, 2, "B");
        b.foreign_keys.push(fk(41, 12));
        b.foreign_keys.push(fk(42, 12));
        b.triggers.push(trigger(51, 12));

        let mut state = state_with(vec![schema(2, "S1", vec![a, b])], SchemaMappingMethod::KeepSchemas);
        plan(&mut state);

        let tables = &state.target().unwrap().schemata[0].tables;
        assert_eq!(tables[0].foreign_keys[0].name, "FK_Parent");
        assert_eq!(tables[1].foreign_keys[0].name, "FK_Parent_1");
        assert_eq!(tables[1].foreign_keys[1].name, "FK_Parent_2");
        assert_eq!(tables[1].triggers[0].name, "audit_1");
    }

    #[test]
    fn test_empty_and_duplicate_columns() {
        let mut t = table(10, 2, "T");
        t.columns.push(Column::new(ObjectId(600), ObjectId(10), "ID"));
        t.columns.push(Column::new(ObjectId(601), ObjectId(10), ""));
        let mut state = state_with(vec![schema(2, "S1", vec![t])], SchemaMappingMethod::KeepSchemas);
        plan(&mut state);

        let columns: Vec<String> = state.target().unwrap().schemata[0].tables[0]
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(columns, vec!["id", "ID_1", "column_601"]);
    }

    #[test]
    fn test_plan_is_idempotent() {
        for method in [
            SchemaMappingMethod::KeepSchemas,
            SchemaMappingMethod::DropCatalog,
            SchemaMappingMethod::MergeWithPrefix,
        ] {
            let mut state = state_with(
                vec![
                    schema(2, "S1", vec![table(10, 2, "T"), table(11, 2, &"y".repeat(80))]),
                    schema(3, "S2", vec![table(20, 3, "T")]),
                ],
                method,
            );
            plan(&mut state);
            let once = state.target().unwrap().clone();
            let logged = state.object_migration_log.len();

            plan(&mut state);
            assert_eq!(state.target().unwrap(), &once, "{} changed on replan", method);
            assert_eq!(state.object_migration_log.len(), logged);
        }
    }
}
