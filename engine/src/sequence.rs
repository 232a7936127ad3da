//! Per-field edit sequence numbers.
//!
//! Every local edit to a field bumps that field's sequence. A request
//! remembers the sequences it was built from; when its outcome arrives, a
//! field whose sequence has moved on has been edited again in the meantime
//! and the outcome must not touch it.

use crate::FieldKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A field's edit sequence number.
///
/// Starts at zero (never edited) and only ever grows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EditSeq(u64);

impl EditSeq {
    /// Sequence of a field that was never edited locally.
    pub const ZERO: EditSeq = EditSeq(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The sequence following this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for EditSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Edit sequences for the fields of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMap<K: FieldKey> {
    counters: BTreeMap<K, EditSeq>,
}

impl<K: FieldKey> SequenceMap<K> {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    /// Current sequence of a field.
    pub fn get(&self, key: K) -> EditSeq {
        self.counters.get(&key).copied().unwrap_or_default()
    }

    /// Record a new edit and return the field's new sequence.
    pub fn bump(&mut self, key: K) -> EditSeq {
        let counter = self.counters.entry(key).or_default();
        *counter = counter.next();
        *counter
    }

    /// Whether `seen` is still the latest edit of `key`.
    pub fn is_current(&self, key: K, seen: EditSeq) -> bool {
        self.get(key) == seen
    }

    /// Capture the current sequences of `keys`.
    pub fn snapshot(&self, keys: impl IntoIterator<Item = K>) -> BTreeMap<K, EditSeq> {
        keys.into_iter().map(|key| (key, self.get(key))).collect()
    }
}

impl<K: FieldKey> Default for SequenceMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
