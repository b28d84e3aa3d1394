//! Per-run context handed to every migration hook.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::core::lookup::CatalogIndex;
use crate::core::rdbms::{SimpleType, TypeRegistry};
use crate::core::schema::{Catalog, Entity, ObjectId, ObjectKind};
use crate::core::version::Version;
use crate::error::{MigrateError, Result};
use crate::state::{MigrationState, ObjectRef, PendingLog, Severity};

/// Everything a migration step reads or writes besides the object it works on.
///
/// The source catalog is borrowed separately from the state so the walk can
/// hold source entities while it records mappings and log entries.
pub struct MigrationContext<'a> {
    pub state: &'a mut MigrationState,
    pub source: &'a Catalog,
    pub source_index: CatalogIndex,
    pub target_types: TypeRegistry,
    pub target_version: Version,
    /// Foreign key names already used, per source schema.
    foreign_key_names: HashMap<ObjectId, HashSet<String>>,
    /// Target columns whose datatype could not be mapped.
    untyped_columns: HashSet<ObjectId>,
}

impl<'a> MigrationContext<'a> {
    pub fn new(
        state: &'a mut MigrationState,
        source: &'a Catalog,
        target_version: Version,
    ) -> Result<Self> {
        if state.target_rdbms.simple_datatypes.is_empty() {
            return Err(MigrateError::contract(format!(
                "target RDBMS {} has no simple datatypes registered",
                state.target_rdbms.name
            )));
        }
        let target_types = TypeRegistry::from_types(&state.target_rdbms.simple_datatypes);
        Ok(Self {
            state,
            source,
            source_index: CatalogIndex::build(source),
            target_types,
            target_version,
            foreign_key_names: HashMap::new(),
            untyped_columns: HashSet::new(),
        })
    }

    pub fn allocate_id(&mut self) -> ObjectId {
        self.state.allocate_id()
    }

    /// Record a source → target pair.
    pub fn record(&mut self, source: ObjectId, target: ObjectId) {
        self.state.record_mapping(source, target);
    }

    pub fn target_of(&self, source: ObjectId) -> Option<ObjectId> {
        self.state.lookup_target_object(source)
    }

    pub fn source_of(&self, target: ObjectId) -> Option<ObjectId> {
        self.state.lookup_source_object(target)
    }

    pub fn mark_untyped(&mut self, column: ObjectId) {
        self.untyped_columns.insert(column);
    }

    /// Whether a target column was created without a datatype. Keys and
    /// indices must not reference such columns.
    pub fn is_untyped(&self, column: ObjectId) -> bool {
        self.untyped_columns.contains(&column)
    }

    pub fn target_type(&self, name: &str) -> Option<&SimpleType> {
        self.target_types.get(name)
    }

    /// Simple type of the source catalog.
    pub fn source_type(&self, name: &str) -> Option<&SimpleType> {
        self.source.simple_type(name)
    }

    /// Name of a source column, or its id when it is unknown.
    pub fn source_column_name(&self, id: ObjectId) -> String {
        self.source_index
            .column(self.source, id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.state.option(name)
    }

    pub fn option_bool(&self, name: &str, default: bool) -> bool {
        self.state.option_bool(name, default)
    }

    pub fn should_migrate(&self, kind: ObjectKind, schema: &str, name: &str) -> bool {
        self.state.should_migrate(kind, schema, name)
    }

    // ===== Logging =====

    pub fn log(
        &mut self,
        severity: Severity,
        source: Option<ObjectRef>,
        target: Option<ObjectRef>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let subject = source
            .as_ref()
            .or(target.as_ref())
            .map(|r| format!("{} {}", r.kind, r.name))
            .unwrap_or_default();
        match severity {
            Severity::Note => debug!("{}: {}", subject, message),
            Severity::Warning | Severity::Error => warn!("{} {}: {}", severity, subject, message),
        }
        self.state
            .migration_log
            .add(severity, source, target, message);
    }

    pub fn note(&mut self, source: &impl Entity, target: &impl Entity, message: impl Into<String>) {
        self.log(
            Severity::Note,
            Some(ObjectRef::of(source)),
            Some(ObjectRef::of(target)),
            message,
        );
    }

    pub fn warning(
        &mut self,
        source: &impl Entity,
        target: &impl Entity,
        message: impl Into<String>,
    ) {
        self.log(
            Severity::Warning,
            Some(ObjectRef::of(source)),
            Some(ObjectRef::of(target)),
            message,
        );
    }

    pub fn error(&mut self, source: &impl Entity, target: &impl Entity, message: impl Into<String>) {
        self.log(
            Severity::Error,
            Some(ObjectRef::of(source)),
            Some(ObjectRef::of(target)),
            message,
        );
    }

    /// Move gathered messages into the migration log.
    pub fn flush(&mut self, pending: &mut PendingLog, source: &impl Entity, target: &impl Entity) {
        let source = ObjectRef::of(source);
        let target = ObjectRef::of(target);
        for (severity, message) in pending.drain() {
            self.log(severity, Some(source.clone()), Some(target.clone()), message);
        }
    }

    /// Reserve a foreign key name within a source schema, appending `_1`,
    /// `_2`, ... when it is taken. Names compare case-insensitively.
    pub fn claim_foreign_key_name(&mut self, schema: ObjectId, name: &str) -> String {
        let used = self.foreign_key_names.entry(schema).or_default();
        let mut candidate = name.to_string();
        let mut serial = 0;
        while used.contains(&candidate.to_lowercase()) {
            serial += 1;
            candidate = format!("{}_{}", name, serial);
        }
        used.insert(candidate.to_lowercase());
        candidate
    }
}
