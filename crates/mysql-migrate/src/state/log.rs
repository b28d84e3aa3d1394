//! Per-object migration log.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::schema::{Entity, ObjectId, ObjectKind};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Severity {
    /// Map a numeric level onto a severity, clamping out-of-range values.
    pub fn from_level(level: i64) -> Self {
        match level.clamp(0, 2) {
            0 => Severity::Note,
            1 => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Severity::Note => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of the object a log entry refers to.
///
/// Qualified names are resolved later through a catalog index, since the
/// planner may still rename or move the object after the entry is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
}

impl ObjectRef {
    pub fn of(entity: &impl Entity) -> Self {
        Self {
            id: entity.id(),
            kind: entity.kind(),
            name: entity.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    /// The source object (`refObject`).
    pub source: Option<ObjectRef>,
    /// The target object (`logObject`).
    pub target: Option<ObjectRef>,
}

/// Messages gathered before the object they describe has a place in the
/// target catalog; flushed into a [`MigrationLog`] once it does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingLog {
    entries: Vec<(Severity, String)>,
}

impl PendingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.entries.push((Severity::Note, message.into()));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.entries.push((Severity::Warning, message.into()));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.entries.push((Severity::Error, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (Severity, String)> + '_ {
        self.entries.drain(..)
    }
}

/// Ordered, append-only list of log entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationLog {
    entries: Vec<LogEntry>,
}

impl MigrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn add(
        &mut self,
        severity: Severity,
        source: Option<ObjectRef>,
        target: Option<ObjectRef>,
        message: impl Into<String>,
    ) {
        self.entries.push(LogEntry {
            severity,
            message: message.into(),
            source,
            target,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Entries whose target is the given object.
    pub fn for_target(&self, id: ObjectId) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(move |e| e.target.as_ref().is_some_and(|t| t.id == id))
    }

    /// Entries whose source is the given object.
    pub fn for_source(&self, id: ObjectId) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(move |e| e.source.as_ref().is_some_and(|s| s.id == id))
    }
}

impl<'a> IntoIterator for &'a MigrationLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Table;

    #[test]
    fn test_severity_clamps_levels() {
        assert_eq!(Severity::from_level(-5), Severity::Note);
        assert_eq!(Severity::from_level(0), Severity::Note);
        assert_eq!(Severity::from_level(1), Severity::Warning);
        assert_eq!(Severity::from_level(2), Severity::Error);
        assert_eq!(Severity::from_level(99), Severity::Error);
        assert!(Severity::Error > Severity::Note);
    }

    #[test]
    fn test_log_filters_and_counts() {
        let source = Table::new(ObjectId(3), ObjectId(2), "Orders");
        let target = Table::new(ObjectId(30), ObjectId(20), "Orders");

        let mut log = MigrationLog::new();
        log.add(Severity::Note, Some(ObjectRef::of(&source)), Some(ObjectRef::of(&target)), "copied");
        log.add(Severity::Warning, None, Some(ObjectRef::of(&target)), "renamed");
        log.add(Severity::Error, None, None, "failed");

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(Severity::Warning), 1);
        assert!(log.has_errors());
        assert_eq!(log.for_target(ObjectId(30)).count(), 2);
        assert_eq!(log.for_source(ObjectId(3)).count(), 1);
        assert_eq!(log.entries()[0].target.as_ref().unwrap().kind, ObjectKind::Table);
    }

    #[test]
    fn test_pending_log_drains_in_order() {
        let mut pending = PendingLog::new();
        pending.warning("first");
        pending.note("second");
        let drained: Vec<_> = pending.drain().collect();
        assert_eq!(drained[0], (Severity::Warning, "first".to_string()));
        assert_eq!(drained[1].0, Severity::Note);
        assert!(pending.is_empty());
    }
}
