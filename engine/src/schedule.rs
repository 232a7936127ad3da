//! Flush scheduling.
//!
//! One record has a single debounce timer and a single in-flight slot,
//! shared by all of its fields. [`FlushPhase`] is that pair as an explicit
//! state machine:
//!
//! ```text
//!   Idle ──edit──▶ Scheduled{deadline} ──deadline / flush_now──▶ Flushing(InFlight)
//!    ▲               │   ▲                                          │
//!    │               └edit┘ (re-arm)                                │
//!    └──────────────────── settled, nothing queued ◀────────────────┘
//! ```
//!
//! Settling with queued work goes straight back to `Flushing`.

use crate::{error::Result, EditSeq, Error, FieldKey, FieldValue, Patch, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one flush request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlushTicket(u64);

impl FlushTicket {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for FlushTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A patch handed to the persistence endpoint, awaiting its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlight<K: FieldKey> {
    pub ticket: FlushTicket,
    /// Values submitted
    pub patch: Patch<K>,
    /// Field sequences at submission time
    pub sequences: BTreeMap<K, EditSeq>,
    pub started_at: Timestamp,
}

impl<K: FieldKey> InFlight<K> {
    /// Submitted fields with their value and sequence at submission.
    pub fn into_entries(self) -> impl Iterator<Item = (K, FieldValue, EditSeq)> {
        let InFlight {
            patch, sequences, ..
        } = self;
        patch.into_iter().map(move |(key, value)| {
            let seen = sequences.get(&key).copied().unwrap_or_default();
            (key, value, seen)
        })
    }
}

/// Scheduler + executor state.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushPhase<K: FieldKey> {
    /// No timer, no request
    Idle,
    /// Debounce timer armed
    Scheduled { deadline: Timestamp },
    /// A request is in flight
    Flushing(InFlight<K>),
}

impl<K: FieldKey> FlushPhase<K> {
    pub fn is_flushing(&self) -> bool {
        matches!(self, FlushPhase::Flushing(_))
    }

    /// Armed debounce deadline, if any.
    pub fn deadline(&self) -> Option<Timestamp> {
        match self {
            FlushPhase::Scheduled { deadline } => Some(*deadline),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> Option<&InFlight<K>> {
        match self {
            FlushPhase::Flushing(in_flight) => Some(in_flight),
            _ => None,
        }
    }

    /// (Re)arm the debounce timer unless a request is in flight.
    ///
    /// Returns the new deadline.
    pub fn arm(&mut self, now: Timestamp, debounce_ms: u64) -> Option<Timestamp> {
        if self.is_flushing() {
            return None;
        }
        let deadline = now.saturating_add(debounce_ms);
        *self = FlushPhase::Scheduled { deadline };
        Some(deadline)
    }

    /// Whether the debounce timer has expired.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Drop an armed timer.
    pub fn disarm(&mut self) {
        if matches!(self, FlushPhase::Scheduled { .. }) {
            *self = FlushPhase::Idle;
        }
    }

    pub(crate) fn start(&mut self, in_flight: InFlight<K>) {
        *self = FlushPhase::Flushing(in_flight);
    }

    /// Take the in-flight request matching `ticket`, leaving `Idle`.
    ///
    /// Any other ticket is rejected and the phase is left as it was.
    pub(crate) fn finish(&mut self, ticket: FlushTicket) -> Result<InFlight<K>> {
        match self {
            FlushPhase::Flushing(in_flight) if in_flight.ticket == ticket => {}
            _ => return Err(Error::UnknownFlush(ticket)),
        }
        match std::mem::take(self) {
            FlushPhase::Flushing(in_flight) => Ok(in_flight),
            _ => Err(Error::UnknownFlush(ticket)),
        }
    }
}

// Derived Default would require `K: Default`, which field enums do not implement.
impl<K: FieldKey> Default for FlushPhase<K> {
    fn default() -> Self {
        FlushPhase::Idle
    }
}

/// Work for the driver: call the persistence endpoint with `patch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushRequest<K: FieldKey> {
    pub ticket: FlushTicket,
    pub record_id: RecordId,
    pub patch: Patch<K>,
}
