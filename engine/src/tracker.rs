//! Dirty key tracking.
//!
//! A field is dirty from its first unconfirmed local edit until an outcome
//! for its latest edit settles it. While dirty it keeps the baseline value
//! it had before that first edit, which is what a failed save rolls back to.

use crate::{EditSeq, FieldKey, FieldValue, SequenceMap};
use std::collections::BTreeMap;

/// Which fields carry unconfirmed edits, with their baselines and sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyTracker<K: FieldKey> {
    /// Pre-edit value of every dirty field; presence means dirty
    baselines: BTreeMap<K, FieldValue>,
    /// Edit sequence of every field ever edited
    sequences: SequenceMap<K>,
}

impl<K: FieldKey> DirtyTracker<K> {
    pub fn new() -> Self {
        Self {
            baselines: BTreeMap::new(),
            sequences: SequenceMap::new(),
        }
    }

    /// Record a local edit of `key` whose displayed value is `current`.
    ///
    /// Captures `current` as the baseline on the clean-to-dirty transition
    /// only; later edits keep the original baseline. Returns the new
    /// sequence of the field.
    pub fn mark_dirty(&mut self, key: K, current: &FieldValue) -> EditSeq {
        self.baselines.entry(key).or_insert_with(|| current.clone());
        self.sequences.bump(key)
    }

    pub fn is_dirty(&self, key: K) -> bool {
        self.baselines.contains_key(&key)
    }

    pub fn baseline(&self, key: K) -> Option<&FieldValue> {
        self.baselines.get(&key)
    }

    pub fn sequence(&self, key: K) -> EditSeq {
        self.sequences.get(key)
    }

    /// Whether `seen` is still the latest edit of `key`.
    pub fn is_current(&self, key: K, seen: EditSeq) -> bool {
        self.sequences.is_current(key, seen)
    }

    /// Capture the current sequences of `keys`.
    pub fn snapshot_sequences(&self, keys: impl IntoIterator<Item = K>) -> BTreeMap<K, EditSeq> {
        self.sequences.snapshot(keys)
    }

    /// Dirty fields in key order.
    pub fn dirty_keys(&self) -> impl Iterator<Item = K> + '_ {
        self.baselines.keys().copied()
    }

    pub fn dirty_count(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_clean(&self) -> bool {
        self.baselines.is_empty()
    }

    /// Mark `key` clean, returning its baseline.
    pub fn settle(&mut self, key: K) -> Option<FieldValue> {
        self.baselines.remove(&key)
    }

    /// Move the baseline of a still-dirty field to a newly confirmed value.
    ///
    /// Used when the server confirmed an older edit of a field that has been
    /// edited again since: a later rollback must land on what the server
    /// holds now, not on what it held before the older edit.
    pub fn rebase(&mut self, key: K, confirmed: FieldValue) {
        if let Some(baseline) = self.baselines.get_mut(&key) {
            *baseline = confirmed;
        }
    }
}

impl<K: FieldKey> Default for DirtyTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
