//! Shared object walk behind the default [`SourceMigration`] methods.
//!
//! Every function takes the dialect as `m` and calls back into it for each
//! child object, so dialect overrides apply at every level of the walk.

use tracing::{debug, info};

use crate::core::identifier::unquote_identifier;
use crate::core::rdbms::TypeGroup;
use crate::core::schema::{
    Catalog, Column, DatatypeRef, ForeignKey, Index, IndexColumn, ObjectId, ObjectKind, Routine,
    RoutineGroup, Schema, Table, Trigger, View,
};
use crate::core::traits::{SourceMigration, TypeMapping};
use crate::state::{ObjectRef, PendingLog, Severity};

use super::MigrationContext;

/// Longest index key prefix, in characters, for InnoDB with utf8 (767 / 3).
pub const MAX_INDEX_KEY_LENGTH: i32 = 255;

/// Strip one layer of identifier quoting.
pub fn migrate_identifier(name: &str, log: &mut PendingLog) -> String {
    let unquoted = unquote_identifier(name);
    if unquoted.is_empty() {
        log.warning(format!("Identifier {:?} is empty", name));
    }
    unquoted.to_string()
}

// =============================================================================
// Catalog and schemas
// =============================================================================

pub fn migrate_catalog<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &Catalog,
) -> Catalog {
    info!(
        "Migrating catalog {} ({} schemas) from {}",
        source.name,
        source.schemata.len(),
        m.name()
    );

    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, false);
    let mut target = Catalog::new(cx.allocate_id(), name);
    target.old_name = source.name.clone();
    target.version = cx.target_version.clone();
    target.simple_datatypes = cx.state.target_rdbms.simple_datatypes.clone();
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);

    for schema in &source.schemata {
        m.migrate_schema(cx, schema, &mut target);
    }

    // Foreign keys may point at any table, so they wait until all exist.
    for schema in &source.schemata {
        for table in &schema.tables {
            let Some(target_id) = cx.target_of(table.id) else {
                continue;
            };
            if let Some(target_table) = target.table_mut(target_id) {
                m.migrate_table_to_mysql_2nd_pass(cx, schema, table, target_table);
            }
        }
    }

    target
}

pub fn migrate_schema<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &Schema,
    target_catalog: &mut Catalog,
) -> Option<ObjectId> {
    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, false);
    let mut target = Schema::new(cx.allocate_id(), target_catalog.id, name);
    target.old_name = source.name.clone();
    target.comment = source.comment.clone();
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);

    let (charset, collation) = m.migrate_charset_collation(
        cx,
        &source.default_character_set_name,
        &source.default_collation_name,
        &ObjectRef::of(source),
        &ObjectRef::of(&target),
    );
    target.default_character_set_name = charset;
    target.default_collation_name = collation;

    debug!("Migrating schema {}", source.name);
    m.migrate_schema_contents(cx, source, &mut target);

    let id = target.id;
    target_catalog.schemata.push(target);
    Some(id)
}

pub fn migrate_schema_contents<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &Schema,
    target: &mut Schema,
) {
    for table in &source.tables {
        if !cx.should_migrate(ObjectKind::Table, &source.name, &table.name) {
            debug!("Skipping ignored table {}.{}", source.name, table.name);
            continue;
        }
        m.migrate_table_to_mysql(cx, source, table, target);
    }

    for view in &source.views {
        if !cx.should_migrate(ObjectKind::View, &source.name, &view.name) {
            debug!("Skipping ignored view {}.{}", source.name, view.name);
            continue;
        }
        if let Some(migrated) = m.migrate_view_to_mysql(cx, view, target) {
            target.views.push(migrated);
        }
    }

    for routine in &source.routines {
        if !cx.should_migrate(ObjectKind::Routine, &source.name, &routine.name) {
            debug!("Skipping ignored routine {}.{}", source.name, routine.name);
            continue;
        }
        if let Some(migrated) = m.migrate_routine_to_mysql(cx, routine, target) {
            target.routines.push(migrated);
        }
    }

    for group in &source.routine_groups {
        let mut pending = PendingLog::new();
        let name = m.migrate_identifier(&group.name, &mut pending, false);
        let migrated = RoutineGroup {
            id: cx.allocate_id(),
            owner: target.id,
            name,
            routines: group
                .routines
                .iter()
                .filter_map(|id| cx.target_of(*id))
                .collect(),
        };
        cx.record(group.id, migrated.id);
        cx.flush(&mut pending, group, &migrated);
        target.routine_groups.push(migrated);
    }
}

// =============================================================================
// Tables
// =============================================================================

pub fn migrate_table_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source_schema: &Schema,
    source: &Table,
    target_schema: &mut Schema,
) -> Option<ObjectId> {
    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, false);
    let mut target = Table::new(cx.allocate_id(), target_schema.id, name);
    target.old_name = source.name.clone();
    target.comment = source.comment.clone();
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);

    let (charset, collation) = m.migrate_charset_collation(
        cx,
        &source.default_character_set_name,
        &source.default_collation_name,
        &ObjectRef::of(source),
        &ObjectRef::of(&target),
    );
    target.default_character_set_name = charset;
    target.default_collation_name = collation;

    m.migrate_table_options(cx, source_schema, source, &mut target);
    m.migrate_table_columns_to_mysql(cx, source, &mut target);
    hoist_column_collation(&mut target);
    m.migrate_table_indices_to_mysql(cx, source, &mut target);
    m.migrate_table_primary_key(cx, source, &mut target);
    normalize_auto_increment(cx, source, &mut target);

    for trigger in &source.triggers {
        if !cx.should_migrate(ObjectKind::Trigger, &source_schema.name, &trigger.name) {
            debug!("Skipping ignored trigger {}.{}", source_schema.name, trigger.name);
            continue;
        }
        if let Some(migrated) = m.migrate_trigger_to_mysql(cx, trigger, &target) {
            target.triggers.push(migrated);
        }
    }

    debug!(
        "Migrated table {}.{} ({} columns, {} indices)",
        source_schema.name,
        source.name,
        target.columns.len(),
        target.indices.len()
    );

    let id = target.id;
    target_schema.tables.push(target);
    Some(id)
}

/// Move a collation shared by every column up to the table.
fn hoist_column_collation(table: &mut Table) {
    if !table.default_collation_name.is_empty() || table.columns.is_empty() {
        return;
    }
    let first = table.columns[0].collation_name.clone();
    if first.is_empty() || table.columns.iter().any(|c| c.collation_name != first) {
        return;
    }
    for column in &mut table.columns {
        column.collation_name.clear();
    }
    table.default_collation_name = first;
}

/// MySQL only allows auto increment on a key column, and only one per table.
fn normalize_auto_increment(cx: &mut MigrationContext<'_>, source: &Table, target: &mut Table) {
    let pk_columns: Vec<ObjectId> = target
        .primary_key_index()
        .map(|pk| pk.columns.iter().map(|ic| ic.column).collect())
        .unwrap_or_default();
    let mut messages: Vec<(ObjectId, Severity, String)> = Vec::new();

    if pk_columns.len() > 1 {
        let auto: Vec<ObjectId> = pk_columns
            .iter()
            .copied()
            .filter(|id| target.column(*id).is_some_and(|c| c.auto_increment))
            .collect();
        if let Some((&first, rest)) = auto.split_first() {
            for id in rest {
                if let Some(column) = target.column_mut(*id) {
                    column.auto_increment = false;
                    messages.push((
                        *id,
                        Severity::Warning,
                        format!(
                            "Autoincrement unset for column {}: only one autoincrement column is allowed in MySQL",
                            column.name
                        ),
                    ));
                }
            }
            let pk_id = target.primary_key;
            if let Some(pk) = target.indices.iter_mut().find(|i| Some(i.id) == pk_id) {
                if let Some(pos) = pk.columns.iter().position(|ic| ic.column == first) {
                    if pos > 0 {
                        let moved = pk.columns.remove(pos);
                        pk.columns.insert(0, moved);
                        messages.push((
                            first,
                            Severity::Note,
                            "Autoincrement column moved to the first position of the primary key"
                                .to_string(),
                        ));
                    }
                }
            }
        }
    }

    for column in &mut target.columns {
        if column.auto_increment && !pk_columns.contains(&column.id) {
            column.auto_increment = false;
            messages.push((
                column.id,
                Severity::Warning,
                format!(
                    "Autoincrement unset for column {}: Autoincrement for non primary key columns is not allowed in MySQL",
                    column.name
                ),
            ));
        }
    }

    for (id, severity, message) in messages {
        let source_ref = cx
            .source_of(id)
            .and_then(|sid| source.column(sid))
            .map(ObjectRef::of);
        let target_ref = target.column(id).map(ObjectRef::of);
        cx.log(severity, source_ref, target_ref, message);
    }
}

// =============================================================================
// Columns
// =============================================================================

pub fn migrate_table_columns_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &Table,
    target: &mut Table,
) {
    for column in &source.columns {
        if let Some(migrated) = m.migrate_table_column_to_mysql(cx, source, column, target) {
            if migrated.datatype.is_none() {
                cx.mark_untyped(migrated.id);
            }
            target.columns.push(migrated);
        }
    }
    if !cx.target_version.is_at_least(5, 6, 5) {
        keep_single_current_timestamp(cx, source, target);
    }
}

pub fn migrate_table_column_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source_table: &Table,
    source: &Column,
    target_table: &Table,
) -> Option<Column> {
    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, true);
    let mut target = Column::new(cx.allocate_id(), target_table.id, name);
    target.old_name = source.name.clone();
    target.comment = source.comment.clone();
    target.flags = source.flags.clone();
    target.is_not_null = source.is_not_null;
    target.default_value_is_null = source.default_value_is_null;
    target.length = source.length;
    target.precision = source.precision;
    target.scale = source.scale;
    target.datatype_explicit_params = source.datatype_explicit_params.clone();
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);

    if !source.character_set_name.is_empty() || !source.collation_name.is_empty() {
        let (charset, collation) = m.migrate_charset_collation(
            cx,
            &source.character_set_name,
            &source.collation_name,
            &ObjectRef::of(source),
            &ObjectRef::of(&target),
        );
        target.character_set_name = charset;
        target.collation_name = collation;
    }

    if m.migrate_datatype_for_column(cx, source_table, source, &mut target)
        && !source.default_value.is_empty()
    {
        target.default_value =
            m.migrate_column_default_value(cx, &source.default_value, source, &mut target);
    }
    m.migrate_column_extras(cx, source, &mut target);

    Some(target)
}

/// Servers before 5.6.5 accept `CURRENT_TIMESTAMP` on one TIMESTAMP column.
fn keep_single_current_timestamp(cx: &mut MigrationContext<'_>, source: &Table, target: &mut Table) {
    let mut seen = false;
    let mut removed = Vec::new();
    for column in &mut target.columns {
        let is_timestamp = matches!(
            &column.datatype,
            Some(DatatypeRef::Simple(name)) if name.eq_ignore_ascii_case("TIMESTAMP")
        );
        if !is_timestamp
            || !column
                .default_value
                .to_ascii_uppercase()
                .contains("CURRENT_TIMESTAMP")
        {
            continue;
        }
        if seen {
            column.default_value.clear();
            removed.push(column.id);
        }
        seen = true;
    }

    for id in removed {
        let source_ref = cx
            .source_of(id)
            .and_then(|sid| source.column(sid))
            .map(ObjectRef::of);
        let target_ref = target.column(id).map(ObjectRef::of);
        cx.log(
            Severity::Warning,
            source_ref,
            target_ref,
            "DEFAULT CURRENT_TIMESTAMP can only be used in the first TIMESTAMP column of the table. Default value removed.",
        );
    }
}

/// Upper-case source type name of a column, following a user type to its
/// actual type. User type flags and sizes are copied onto `target`. Logs an
/// error and returns `None` when the column has no usable type.
pub fn resolve_source_type(
    cx: &mut MigrationContext<'_>,
    source_table: &Table,
    source: &Column,
    target: &mut Column,
) -> Option<String> {
    match &source.datatype {
        Some(DatatypeRef::Simple(name)) => return Some(name.to_ascii_uppercase()),
        Some(DatatypeRef::User(name)) => {
            if let Some(user) = cx.source.user_type(name) {
                for flag in &user.flags {
                    target.add_flag(flag);
                }
                if target.length < 0 && user.character_maximum_length > 0 {
                    target.length = user.character_maximum_length;
                }
                if target.precision < 0 && user.numeric_precision > 0 {
                    target.precision = user.numeric_precision;
                }
                if target.scale < 0 && user.numeric_scale >= 0 {
                    target.scale = user.numeric_scale;
                }
                return Some(user.actual_type.to_ascii_uppercase());
            }
        }
        None => {}
    }
    cx.error(
        source,
        target,
        format!(
            "Could not migrate type of column \"{}\" in \"{}\" ({})",
            source.name, source_table.name, source.formatted_raw_type
        ),
    );
    None
}

/// Apply a datatype mapping to `target`. The mapping's own message is logged
/// first; a target type the registry does not know is then an error.
pub fn apply_type_mapping(
    cx: &mut MigrationContext<'_>,
    source_table: &Table,
    source: &Column,
    target: &mut Column,
    mapping: TypeMapping,
) -> bool {
    if let Some((severity, message)) = mapping.message {
        cx.log(
            severity,
            Some(ObjectRef::of(source)),
            Some(ObjectRef::of(&*target)),
            message,
        );
    }
    let Some(simple) = cx.target_type(&mapping.target_type) else {
        cx.error(
            source,
            target,
            format!(
                "Could not migrate column \"{}\" in \"{}\": Unknown datatype \"{}\"",
                target.name, source_table.name, mapping.target_type
            ),
        );
        return false;
    };
    target.datatype = Some(DatatypeRef::Simple(simple.name.clone()));
    if let Some(length) = mapping.length {
        target.length = length;
    }
    if let Some(precision) = mapping.precision {
        target.precision = precision;
    }
    if let Some(scale) = mapping.scale {
        target.scale = scale;
    }
    for flag in &mapping.flags {
        target.add_flag(flag);
    }
    if let Some(charset) = mapping.character_set {
        target.character_set_name = charset;
    }
    true
}

// =============================================================================
// Indices and keys
// =============================================================================

pub fn migrate_table_indices_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &Table,
    target: &mut Table,
) {
    for index in &source.indices {
        if let Some(migrated) = m.migrate_table_index_to_mysql(cx, source, index, target) {
            target.indices.push(migrated);
        }
    }
}

pub fn migrate_table_index_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source_table: &Table,
    source: &Index,
    target_table: &Table,
) -> Option<Index> {
    if source_table.columns.is_empty() || target_table.columns.is_empty() {
        cx.error(
            source,
            target_table,
            format!(
                "Source table \"{}\" or target table \"{}\" has no columns, index \"{}\" skipped",
                source_table.name, target_table.name, source.name
            ),
        );
        return None;
    }

    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, false);
    let id = cx.allocate_id();

    let mut columns = Vec::with_capacity(source.columns.len());
    for index_column in &source.columns {
        let target_column = cx
            .target_of(index_column.column)
            .and_then(|cid| target_table.column(cid));
        let Some(target_column) = target_column else {
            let column_name = cx.source_column_name(index_column.column);
            cx.error(
                source,
                target_table,
                format!(
                    "Could not find a target column for column \"{}\" of index \"{}\" in table \"{}\", index skipped",
                    column_name, source.name, source_table.name
                ),
            );
            return None;
        };
        if cx.is_untyped(target_column.id) {
            cx.error(
                source,
                target_table,
                format!(
                    "Column \"{}\" of index \"{}\" in table \"{}\" has no datatype, index skipped",
                    target_column.name, source.name, source_table.name
                ),
            );
            return None;
        }

        let length = key_prefix_length(cx, target_column, index_column.column_length);
        if length != index_column.column_length {
            pending.warning(format!(
                "Truncated key column length for column {} from {} to {}",
                target_column.name, index_column.column_length, length
            ));
        }
        columns.push(IndexColumn {
            id: cx.allocate_id(),
            column: target_column.id,
            column_length: length,
            descend: index_column.descend,
        });
    }

    let target = Index {
        id,
        owner: target_table.id,
        name,
        old_name: source.name.clone(),
        comment: source.comment.clone(),
        is_primary: source.is_primary,
        unique: source.unique,
        clustered: source.clustered,
        index_type: source.index_type.clone(),
        columns,
    };
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);
    Some(target)
}

/// Prefix length for an index column, capped at [`MAX_INDEX_KEY_LENGTH`].
/// TEXT and BLOB columns always get one.
fn key_prefix_length(cx: &MigrationContext<'_>, column: &Column, column_length: i32) -> i32 {
    let Some(group) = column
        .datatype
        .as_ref()
        .and_then(|dt| cx.target_type(dt.name()))
        .map(|t| t.group)
    else {
        return column_length;
    };
    if !group.is_prefix_indexable() {
        return column_length;
    }

    let limit = if column.length > 0 {
        column.length.min(MAX_INDEX_KEY_LENGTH)
    } else {
        MAX_INDEX_KEY_LENGTH
    };
    if column_length > 0 {
        column_length.min(limit)
    } else if column.length > 0 && limit < column.length {
        limit
    } else if matches!(group, TypeGroup::Text | TypeGroup::Blob) {
        limit
    } else {
        column_length
    }
}

pub fn migrate_table_primary_key(cx: &mut MigrationContext<'_>, source: &Table, target: &mut Table) {
    let Some(source_pk) = source.primary_key else {
        return;
    };
    match cx
        .target_of(source_pk)
        .filter(|id| target.index(*id).is_some())
    {
        Some(id) => target.primary_key = Some(id),
        None => cx.error(
            source,
            &*target,
            format!("Primary key of table \"{}\" could not be migrated", source.name),
        ),
    }
}

pub fn migrate_table_foreign_keys_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source_schema: &Schema,
    source: &Table,
    target: &mut Table,
) -> usize {
    let mut migrated = 0;
    for foreign_key in &source.foreign_keys {
        if foreign_key.model_only {
            continue;
        }
        if let Some(fk) =
            m.migrate_table_foreign_key_to_mysql(cx, source_schema, source, foreign_key, target)
        {
            target.foreign_keys.push(fk);
            migrated += 1;
        }
    }
    migrated
}

pub fn migrate_table_foreign_key_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source_schema: &Schema,
    source_table: &Table,
    source: &ForeignKey,
    target_table: &Table,
) -> Option<ForeignKey> {
    let Some(referenced_table) = cx.target_of(source.referenced_table) else {
        cx.error(
            source,
            target_table,
            format!(
                "Could not find the target table referenced by foreign key \"{}\" of table \"{}\"",
                source.name, source_table.name
            ),
        );
        return None;
    };

    let mut columns = Vec::with_capacity(source.columns.len());
    for column in &source.columns {
        match cx
            .target_of(*column)
            .filter(|id| target_table.column(*id).is_some() && !cx.is_untyped(*id))
        {
            Some(id) => columns.push(id),
            None => {
                let column_name = cx.source_column_name(*column);
                cx.error(
                    source,
                    target_table,
                    format!(
                        "Could not migrate foreign key \"{}\" of table \"{}\": column \"{}\" was not migrated",
                        source.name, source_table.name, column_name
                    ),
                );
                return None;
            }
        }
    }

    let mut referenced_columns = Vec::with_capacity(source.referenced_columns.len());
    for column in &source.referenced_columns {
        match cx.target_of(*column) {
            Some(id) if !cx.is_untyped(id) => referenced_columns.push(id),
            _ => {
                let column_name = cx.source_column_name(*column);
                cx.error(
                    source,
                    target_table,
                    format!(
                        "Could not migrate foreign key \"{}\" of table \"{}\": referenced column \"{}\" was not migrated",
                        source.name, source_table.name, column_name
                    ),
                );
                return None;
            }
        }
    }

    let mut pending = PendingLog::new();
    let migrated_name = m.migrate_identifier(&source.name, &mut pending, false);
    let name = cx.claim_foreign_key_name(source_schema.id, &migrated_name);
    if name != migrated_name {
        pending.warning(format!(
            "The foreign key constraint name \"{}\" is duplicated. Changed to \"{}\"",
            migrated_name, name
        ));
    }

    let target = ForeignKey {
        id: cx.allocate_id(),
        owner: target_table.id,
        name,
        old_name: source.name.clone(),
        comment: source.comment.clone(),
        columns,
        referenced_table,
        referenced_columns,
        update_rule: source.update_rule,
        delete_rule: source.delete_rule,
        model_only: false,
    };
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);
    Some(target)
}

// =============================================================================
// Triggers, views and routines
// =============================================================================

const UNTRANSLATED_BODY: &str =
    "SQL body copied verbatim; it was not translated to MySQL syntax and may need manual changes";

pub fn migrate_trigger_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &Trigger,
    target_table: &Table,
) -> Option<Trigger> {
    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, false);
    if m.annotate_untranslated_bodies(cx) {
        pending.note(UNTRANSLATED_BODY);
    }
    let target = Trigger {
        id: cx.allocate_id(),
        owner: target_table.id,
        name,
        old_name: source.name.clone(),
        event: source.event.clone(),
        timing: source.timing.clone(),
        sql_definition: source.sql_definition.clone(),
        commented_out: false,
    };
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);
    Some(target)
}

pub fn migrate_view_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &View,
    target_schema: &Schema,
) -> Option<View> {
    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, false);
    if m.annotate_untranslated_bodies(cx) {
        pending.note(UNTRANSLATED_BODY);
    }
    let target = View {
        id: cx.allocate_id(),
        owner: target_schema.id,
        name,
        old_name: source.name.clone(),
        sql_definition: source.sql_definition.clone(),
        commented_out: false,
    };
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);
    Some(target)
}

pub fn migrate_routine_to_mysql<M: SourceMigration + ?Sized>(
    m: &M,
    cx: &mut MigrationContext<'_>,
    source: &Routine,
    target_schema: &Schema,
) -> Option<Routine> {
    let mut pending = PendingLog::new();
    let name = m.migrate_identifier(&source.name, &mut pending, false);
    if m.annotate_untranslated_bodies(cx) {
        pending.note(UNTRANSLATED_BODY);
    }
    let target = Routine {
        id: cx.allocate_id(),
        owner: target_schema.id,
        name,
        old_name: source.name.clone(),
        routine_type: source.routine_type,
        sql_definition: source.sql_definition.clone(),
        commented_out: false,
    };
    cx.record(source.id, target.id);
    cx.flush(&mut pending, source, &target);
    Some(target)
}
