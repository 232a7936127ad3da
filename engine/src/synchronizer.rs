//! FieldSynchronizer - the optimistic state of one record in one editor session.
//!
//! The synchronizer owns the local store, the dirty tracker, the queued
//! patch, the flush phase and the save status. It performs no IO and reads
//! no clock: the caller passes `now` in, performs the [`FlushRequest`]s it
//! hands out, and reports their outcomes back with
//! [`FieldSynchronizer::complete_flush`].
//!
//! ```text
//! apply_edit ──▶ queued ──(debounce / flush_now)──▶ in flight ──complete_flush──▶ reconciled
//!                  ▲                                                                │
//!                  └─────────────── edits made meanwhile go out next ◀──────────────┘
//! ```

use crate::{
    error::Result, key_names, Aftermath, DirtyTracker, EditSeq, Error, FieldKey, FieldValue,
    FlushPhase, FlushRequest, FlushTicket, InFlight, Patch, ReconcileReport, Reconciler, Record,
    RecordId, SaveFailure, SaveOutcome, SaveStatus, StatusMachine, SyncConfig, SyncView,
    Timestamp,
};

/// Result of settling a flush.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement<K: FieldKey> {
    /// What happened to each submitted field
    pub report: ReconcileReport<K>,
    /// Edits queued while the request was in flight, to be sent right away
    pub next: Option<FlushRequest<K>>,
}

/// Optimistic synchronization state of a single record.
#[derive(Debug, Clone)]
pub struct FieldSynchronizer<K: FieldKey> {
    config: SyncConfig,
    /// Local optimistic store
    record: Record<K>,
    tracker: DirtyTracker<K>,
    /// Edits not yet handed to the endpoint
    queued: Patch<K>,
    phase: FlushPhase<K>,
    status: StatusMachine,
    last_error: Option<SaveFailure>,
    last_ticket: FlushTicket,
}

impl<K: FieldKey> FieldSynchronizer<K> {
    /// Seed a synchronizer from an authoritative snapshot.
    pub fn new(
        record_id: impl Into<RecordId>,
        snapshot: Patch<K>,
        config: SyncConfig,
    ) -> Result<Self> {
        let record = Record::from_snapshot(record_id, snapshot)?;
        Ok(Self::from_record(record, config))
    }

    /// Seed a synchronizer from an already validated record.
    pub fn from_record(record: Record<K>, config: SyncConfig) -> Self {
        Self {
            config,
            record,
            tracker: DirtyTracker::new(),
            queued: Patch::new(),
            phase: FlushPhase::Idle,
            status: StatusMachine::new(),
            last_error: None,
            last_ticket: FlushTicket::new(0),
        }
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record.id
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Currently displayed value of a field.
    pub fn value(&self, key: K) -> Option<&FieldValue> {
        self.record.get(key)
    }

    /// Currently displayed values of all fields.
    pub fn values(&self) -> &Patch<K> {
        self.record.fields()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.status.status()
    }

    pub fn last_error(&self) -> Option<&SaveFailure> {
        self.last_error.as_ref()
    }

    /// Fields with unconfirmed edits, sorted.
    pub fn pending_keys(&self) -> Vec<K> {
        self.tracker.dirty_keys().collect()
    }

    pub fn is_dirty(&self, key: K) -> bool {
        self.tracker.is_dirty(key)
    }

    pub fn sequence(&self, key: K) -> EditSeq {
        self.tracker.sequence(key)
    }

    pub fn baseline(&self, key: K) -> Option<&FieldValue> {
        self.tracker.baseline(key)
    }

    /// Edits waiting for the next flush.
    pub fn queued(&self) -> &Patch<K> {
        &self.queued
    }

    pub fn in_flight(&self) -> Option<&InFlight<K>> {
        self.phase.in_flight()
    }

    pub fn phase(&self) -> &FlushPhase<K> {
        &self.phase
    }

    /// Nothing queued and nothing in flight.
    pub fn is_settled(&self) -> bool {
        self.queued.is_empty() && !self.phase.is_flushing()
    }

    /// Apply a local edit.
    ///
    /// The new value is visible immediately. Returns the (re)armed debounce
    /// deadline, or `None` while a request is in flight: the edit then waits
    /// for that request to settle and goes out right after it.
    pub fn apply_edit(&mut self, key: K, value: FieldValue, now: Timestamp) -> Option<Timestamp> {
        let current = self.record.get(key).cloned().unwrap_or_default();
        self.tracker.mark_dirty(key, &current);
        self.queued.insert(key, value.clone());
        self.record.set(key, value);
        self.status.saving();
        self.phase.arm(now, self.config.debounce_ms)
    }

    /// Flush queued edits now, skipping the debounce.
    ///
    /// Returns `None` when nothing is queued or a request is already in
    /// flight (queued edits follow it as soon as it settles).
    pub fn flush_now(&mut self, now: Timestamp) -> Option<FlushRequest<K>> {
        if self.phase.is_flushing() {
            return None;
        }
        self.begin_flush(now)
    }

    /// Advance timers: fire an expired debounce, expire the `saved` status.
    pub fn tick(&mut self, now: Timestamp) -> Option<FlushRequest<K>> {
        self.status.tick(now);
        if self.phase.is_due(now) {
            return self.begin_flush(now);
        }
        None
    }

    /// Earliest time at which [`tick`](Self::tick) has something to do.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        let saved_until = match self.status.status() {
            SaveStatus::Saved => self.status.saved_until(),
            _ => None,
        };
        match (self.phase.deadline(), saved_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn begin_flush(&mut self, now: Timestamp) -> Option<FlushRequest<K>> {
        if self.queued.is_empty() {
            self.phase.disarm();
            return None;
        }

        let patch = std::mem::take(&mut self.queued);
        let sequences = self.tracker.snapshot_sequences(patch.keys().copied());
        self.last_ticket = self.last_ticket.next();
        let ticket = self.last_ticket;

        self.phase.start(InFlight {
            ticket,
            patch: patch.clone(),
            sequences,
            started_at: now,
        });
        self.status.saving();
        self.last_error = None;

        Some(FlushRequest {
            ticket,
            record_id: self.record.id.clone(),
            patch,
        })
    }

    /// Report the outcome of the request identified by `ticket`.
    ///
    /// Fails without side effects if `ticket` is not the request in flight.
    /// If edits were queued meanwhile, the settlement carries the next
    /// request, already in flight.
    pub fn complete_flush(
        &mut self,
        ticket: FlushTicket,
        outcome: impl Into<SaveOutcome<K>>,
        now: Timestamp,
    ) -> Result<Settlement<K>> {
        let in_flight = self.phase.finish(ticket)?;
        let reconciler = Reconciler::new(&mut self.record, &mut self.tracker);
        let report = reconciler.reconcile(in_flight, outcome.into());

        if let Some(failure) = &report.failure {
            self.last_error = Some(failure.clone());
        }

        let aftermath = if !self.queued.is_empty() {
            Aftermath::MoreQueued
        } else if report.is_failure() || !self.tracker.is_clean() {
            Aftermath::Failed
        } else {
            Aftermath::Done
        };
        self.status.settle(aftermath, now, self.config.saved_display_ms);

        let next = match aftermath {
            Aftermath::MoreQueued => self.begin_flush(now),
            _ => None,
        };

        Ok(Settlement { report, next })
    }

    /// Replace displayed values with externally received authoritative ones.
    ///
    /// Only allowed while nothing is queued, in flight, or dirty; otherwise
    /// the update would clobber unconfirmed edits and is refused.
    pub fn apply_authoritative(&mut self, values: Patch<K>) -> Result<()> {
        if !self.is_settled() || !self.tracker.is_clean() {
            let mut fields: Vec<K> = self.tracker.dirty_keys().collect();
            fields.extend(self.queued.keys().copied());
            if let Some(in_flight) = self.phase.in_flight() {
                fields.extend(in_flight.patch.keys().copied());
            }
            fields.sort();
            fields.dedup();
            return Err(Error::UnconfirmedEdits {
                record_id: self.record.id.clone(),
                fields: key_names(fields),
            });
        }

        self.record.merge(values);
        Ok(())
    }

    /// One-line status for display.
    pub fn status_line(&self) -> String {
        match self.status.status() {
            SaveStatus::Idle => "idle".to_string(),
            SaveStatus::Saved => "saved".to_string(),
            SaveStatus::Saving if self.phase.is_flushing() => "saving".to_string(),
            SaveStatus::Saving => format!("{} pending", self.tracker.dirty_count()),
            SaveStatus::Error => match &self.last_error {
                Some(failure) => format!("error: {}", failure.message()),
                None => "error".to_string(),
            },
        }
    }

    /// Everything the display layer reads, as one value.
    pub fn view(&self) -> SyncView<K> {
        SyncView {
            record_id: self.record.id.clone(),
            status: self.status.status(),
            status_line: self.status_line(),
            pending_keys: self.pending_keys(),
            last_error: self.last_error.as_ref().map(|e| e.message().to_string()),
            values: self.record.fields().clone(),
            flushing: self.phase.is_flushing(),
        }
    }
}
