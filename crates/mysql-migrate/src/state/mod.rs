//! Migration state: everything one run reads and produces.
//!
//! A [`MigrationState`] is owned by exactly one run. It holds the source and
//! target catalogs, the object migration options, the four logs and the
//! source ↔ target object map. States serialize to JSON so a finished run
//! can be inspected or handed to a collaborator that copies data.

mod log;
mod map;

pub use log::{LogEntry, MigrationLog, ObjectRef, PendingLog, Severity};
pub use map::ObjectMap;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::DatatypeMapping;
use crate::core::rdbms::Rdbms;
use crate::core::schema::{Catalog, ObjectId, ObjectKind};
use crate::core::version::Version;
use crate::error::{MigrateError, Result};

/// Opaque description of a connection handled by an external collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    pub driver: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationState {
    pub source_catalog: Option<Catalog>,
    pub target_catalog: Option<Catalog>,
    pub source_db_version: Option<Version>,
    pub target_db_version: Option<Version>,
    #[serde(default)]
    pub source_connection: ConnectionDescriptor,
    #[serde(default)]
    pub target_connection: ConnectionDescriptor,
    /// RDBMS record of the target; its simple types drive datatype mapping.
    pub target_rdbms: Rdbms,
    #[serde(default)]
    pub object_migration_params: BTreeMap<String, String>,
    #[serde(default)]
    pub data_bulk_transfer_params: BTreeMap<String, String>,
    #[serde(default)]
    pub generic_datatype_mappings: Vec<DatatypeMapping>,
    #[serde(default)]
    pub ignore_list: Vec<String>,
    /// Written by the schema-mapping planner.
    #[serde(default)]
    pub object_migration_log: MigrationLog,
    /// Written by the object transformer.
    #[serde(default)]
    pub migration_log: MigrationLog,
    /// Written by the collaborator that executes the DDL script.
    #[serde(default)]
    pub creation_log: MigrationLog,
    /// Written by the collaborator that copies rows.
    #[serde(default)]
    pub data_transfer_log: MigrationLog,
    #[serde(default)]
    pub object_map: ObjectMap,
    #[serde(default)]
    next_id: u32,
    #[serde(default)]
    truncation_serial: u32,
}

impl Default for MigrationState {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationState {
    /// Create an empty state targeting MySQL.
    pub fn new() -> Self {
        Self {
            source_catalog: None,
            target_catalog: None,
            source_db_version: None,
            target_db_version: None,
            source_connection: ConnectionDescriptor::default(),
            target_connection: ConnectionDescriptor::default(),
            target_rdbms: Rdbms::mysql(),
            object_migration_params: BTreeMap::new(),
            data_bulk_transfer_params: BTreeMap::new(),
            generic_datatype_mappings: Vec::new(),
            ignore_list: Vec::new(),
            object_migration_log: MigrationLog::new(),
            migration_log: MigrationLog::new(),
            creation_log: MigrationLog::new(),
            data_transfer_log: MigrationLog::new(),
            object_map: ObjectMap::new(),
            next_id: 0,
            truncation_serial: 0,
        }
    }

    /// Create a state for migrating the given source catalog.
    pub fn with_source(source: Catalog) -> Self {
        let mut state = Self::new();
        state.source_db_version = Some(source.version.clone());
        state.reserve_ids_above(&source);
        state.source_catalog = Some(source);
        state
    }

    /// Keep freshly allocated target ids above every source id, so an id
    /// alone tells which catalog it belongs to.
    pub(crate) fn reserve_ids_above(&mut self, catalog: &Catalog) {
        self.next_id = self.next_id.max(max_id(catalog));
    }

    /// Allocate a fresh object id.
    pub fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    /// Next value of the per-run serial appended to truncated identifiers.
    pub fn next_truncation_serial(&mut self) -> u32 {
        self.truncation_serial += 1;
        self.truncation_serial
    }

    pub fn source(&self) -> Result<&Catalog> {
        self.source_catalog
            .as_ref()
            .ok_or_else(|| MigrateError::contract("no source catalog in migration state"))
    }

    pub fn target(&self) -> Result<&Catalog> {
        self.target_catalog
            .as_ref()
            .ok_or_else(|| MigrateError::contract("no target catalog in migration state"))
    }

    /// Record a source → target pair in the object map.
    pub fn record_mapping(&mut self, source: ObjectId, target: ObjectId) {
        self.object_map.insert(source, target);
    }

    pub fn lookup_target_object(&self, source: ObjectId) -> Option<ObjectId> {
        self.object_map.target_of(source)
    }

    pub fn lookup_source_object(&self, target: ObjectId) -> Option<ObjectId> {
        self.object_map.source_of(target)
    }

    /// String value of an object migration option.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.object_migration_params.get(name).map(String::as_str)
    }

    /// Boolean value of an object migration option (`true`, `yes`, `1`).
    pub fn option_bool(&self, name: &str, default: bool) -> bool {
        match self.option(name) {
            Some(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "1" | "on"
            ),
            None => default,
        }
    }

    /// Should the named source object be migrated, given the ignore list?
    pub fn should_migrate(&self, kind: ObjectKind, schema: &str, name: &str) -> bool {
        let Some(list_key) = ignore_list_key(kind) else {
            return true;
        };
        let qualified = format!("{}.{}", schema, name);
        !self.ignore_list.iter().any(|entry| {
            entry
                .split_once(':')
                .is_some_and(|(key, pattern)| key == list_key && (pattern == "*" || pattern == qualified))
        })
    }

    /// Save state to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load state from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn max_id(catalog: &Catalog) -> u32 {
    let mut highest = catalog.id.0;
    for schema in &catalog.schemata {
        highest = highest.max(schema.id.0);
        for table in &schema.tables {
            highest = highest.max(table.id.0);
            let nested = table
                .columns
                .iter()
                .map(|c| c.id.0)
                .chain(table.indices.iter().flat_map(|i| {
                    std::iter::once(i.id.0).chain(i.columns.iter().map(|ic| ic.id.0))
                }))
                .chain(table.foreign_keys.iter().map(|f| f.id.0))
                .chain(table.triggers.iter().map(|t| t.id.0));
            highest = nested.fold(highest, u32::max);
        }
        highest = schema
            .views
            .iter()
            .map(|v| v.id.0)
            .chain(schema.routines.iter().map(|r| r.id.0))
            .chain(schema.routine_groups.iter().map(|g| g.id.0))
            .fold(highest, u32::max);
    }
    catalog
        .user_datatypes
        .iter()
        .map(|u| u.id.0)
        .fold(highest, u32::max)
}

fn ignore_list_key(kind: ObjectKind) -> Option<&'static str> {
    match kind {
        ObjectKind::Table => Some("tables"),
        ObjectKind::View => Some("views"),
        ObjectKind::Routine => Some("routines"),
        ObjectKind::Trigger => Some("triggers"),
        _ => None,
    }
}
