//! Bidirectional source ↔ target object map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::schema::ObjectId;

/// Two dictionaries keyed by object id, rebuilt for every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMap {
    source_to_target: BTreeMap<ObjectId, ObjectId>,
    target_to_source: BTreeMap<ObjectId, ObjectId>,
}

impl ObjectMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: ObjectId, target: ObjectId) {
        self.source_to_target.insert(source, target);
        self.target_to_source.insert(target, source);
    }

    pub fn target_of(&self, source: ObjectId) -> Option<ObjectId> {
        self.source_to_target.get(&source).copied()
    }

    pub fn source_of(&self, target: ObjectId) -> Option<ObjectId> {
        self.target_to_source.get(&target).copied()
    }

    /// Point a source object at a different target after the original target
    /// was folded into it (schema merges). The reverse entry of the removed
    /// target is dropped.
    pub fn redirect(&mut self, source: ObjectId, new_target: ObjectId) {
        if let Some(old) = self.source_to_target.insert(source, new_target) {
            if old != new_target {
                self.target_to_source.remove(&old);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.source_to_target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_to_target.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, ObjectId)> + '_ {
        self.source_to_target.iter().map(|(s, t)| (*s, *t))
    }
}
