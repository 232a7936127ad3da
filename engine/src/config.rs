//! Engine timing configuration.

use serde::{Deserialize, Serialize};

/// Quiet period after the last edit before a flush starts.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// How long `saved` stays visible before reverting to `idle`.
pub const DEFAULT_SAVED_DISPLAY_MS: u64 = 2000;

/// Timing knobs of a synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
    /// Display time of the `saved` status in milliseconds
    pub saved_display_ms: u64,
}

impl SyncConfig {
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_saved_display_ms(mut self, saved_display_ms: u64) -> Self {
        self.saved_display_ms = saved_display_ms;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            saved_display_ms: DEFAULT_SAVED_DISPLAY_MS,
        }
    }
}
