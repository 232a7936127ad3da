//! Counter toggle synchronization.
//!
//! For a single boolean with a derived aggregate, such as "I watch this card"
//! and the card's watcher count. Toggles are discrete intents: each one goes
//! out as its own request right away, without debouncing. Instead of
//! per-field sequences the toggle counts requests in flight; once that count
//! drops back to zero the authoritative state is refetched unconditionally,
//! because only the latest state matters.

use crate::SaveFailure;
use serde::{Deserialize, Serialize};

/// Authoritative watch state of a record for the current member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchState {
    pub watching: bool,
    pub count: u64,
}

/// A request to send for one toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleRequest {
    /// Desired flag after this toggle
    pub watching: bool,
}

/// What the caller should do after a toggle request settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleSettlement {
    /// Other requests are still in flight
    Pending,
    /// Nothing in flight anymore: refetch the authoritative state
    Resync,
}

/// Optimistic state of a boolean + counter pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterToggle {
    state: WatchState,
    in_flight: u32,
    needs_resync: bool,
    last_error: Option<SaveFailure>,
}

impl CounterToggle {
    /// Seed from an authoritative state.
    pub fn new(state: WatchState) -> Self {
        Self {
            state,
            in_flight: 0,
            needs_resync: false,
            last_error: None,
        }
    }

    /// Currently displayed state.
    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    /// Whether a request failed since the last authoritative refresh.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    pub fn last_error(&self) -> Option<&SaveFailure> {
        self.last_error.as_ref()
    }

    /// Flip the flag, adjust the count and return the request to send.
    pub fn toggle(&mut self) -> ToggleRequest {
        self.state.watching = !self.state.watching;
        self.state.count = if self.state.watching {
            self.state.count.saturating_add(1)
        } else {
            self.state.count.saturating_sub(1)
        };
        self.in_flight += 1;
        ToggleRequest {
            watching: self.state.watching,
        }
    }

    /// Report the outcome of one toggle request.
    ///
    /// Failures are remembered but not rolled back here: the refetch that
    /// follows once nothing is in flight restores the truth.
    pub fn complete(&mut self, result: Result<(), SaveFailure>) -> ToggleSettlement {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Err(failure) = result {
            self.needs_resync = true;
            self.last_error = Some(failure);
        }

        if self.in_flight == 0 {
            ToggleSettlement::Resync
        } else {
            ToggleSettlement::Pending
        }
    }

    /// Replace the displayed state with an authoritative one.
    ///
    /// Ignored while toggles are in flight, since it predates them. Returns
    /// whether it was applied.
    pub fn apply_authoritative(&mut self, state: WatchState) -> bool {
        if self.in_flight > 0 {
            return false;
        }
        self.state = state;
        self.needs_resync = false;
        self.last_error = None;
        true
    }

    /// A refetch itself failed; keep showing the optimistic state.
    pub fn resync_failed(&mut self, failure: SaveFailure) {
        self.needs_resync = true;
        self.last_error = Some(failure);
    }

    pub fn view(&self) -> ToggleView {
        ToggleView {
            watching: self.state.watching,
            count: self.state.count,
            in_flight: self.in_flight,
            needs_resync: self.needs_resync,
            last_error: self.last_error.as_ref().map(|e| e.message().to_string()),
        }
    }
}

/// Display state of a counter toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleView {
    pub watching: bool,
    pub count: u64,
    pub in_flight: u32,
    pub needs_resync: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
