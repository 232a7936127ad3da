//! Read-only views handed to the display layer.

use crate::{FieldKey, Patch, RecordId, SaveStatus};
use serde::{Deserialize, Serialize};

/// Display state of one synchronized record.
///
/// A plain value so it can be published across tasks and compared cheaply
/// for change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "K: FieldKey")]
pub struct SyncView<K: FieldKey> {
    pub record_id: RecordId,
    pub status: SaveStatus,
    /// "saving", "N pending", "saved", "error: <message>" or "idle"
    pub status_line: String,
    /// Dirty fields, sorted
    pub pending_keys: Vec<K>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Currently displayed value of every field
    pub values: Patch<K>,
    /// Whether a request is in flight
    pub flushing: bool,
}

impl<K: FieldKey> SyncView<K> {
    pub fn is_pending(&self, key: K) -> bool {
        self.pending_keys.binary_search(&key).is_ok()
    }
}
