//! Save status shown to the user.
//!
//! ```text
//!  idle ──edit──▶ saving ──success──▶ saved ──timeout──▶ idle
//!                  │  ▲                 │
//!           failure│  └──────edit───────┘
//!                  ▼  │
//!                 error
//! ```

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse save state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    /// Nothing pending, nothing to report
    #[default]
    Idle,
    /// Edits queued or a request in flight
    Saving,
    /// The last flush confirmed everything; reverts to idle after a while
    Saved,
    /// The last flush failed
    Error,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// What a settled flush left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aftermath {
    /// Edits arrived mid-flight and go out next
    MoreQueued,
    /// The flush failed, or dirty fields remain with nothing queued
    Failed,
    /// Everything submitted is confirmed
    Done,
}

/// Drives [`SaveStatus`] transitions, including the timed `saved -> idle`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMachine {
    status: SaveStatus,
    saved_until: Option<Timestamp>,
}

impl StatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// When the current `saved` status expires.
    pub fn saved_until(&self) -> Option<Timestamp> {
        self.saved_until
    }

    /// A local edit was queued, or a flush started.
    pub fn saving(&mut self) {
        self.status = SaveStatus::Saving;
        self.saved_until = None;
    }

    /// A flush settled.
    pub fn settle(&mut self, aftermath: Aftermath, now: Timestamp, saved_display_ms: u64) {
        self.saved_until = None;
        self.status = match aftermath {
            Aftermath::MoreQueued => SaveStatus::Saving,
            Aftermath::Failed => SaveStatus::Error,
            Aftermath::Done => {
                self.saved_until = Some(now.saturating_add(saved_display_ms));
                SaveStatus::Saved
            }
        };
    }

    /// Expire `saved`. Returns true if the status changed.
    pub fn tick(&mut self, now: Timestamp) -> bool {
        match self.saved_until {
            Some(until) if self.status == SaveStatus::Saved && now >= until => {
                self.status = SaveStatus::Idle;
                self.saved_until = None;
                true
            }
            _ => false,
        }
    }
}
