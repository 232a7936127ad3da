//! Reconciliation of a flush outcome against newer local edits.
//!
//! This is the core of convergence. A response (or failure) describes the
//! record as it was when the request was built; by the time it arrives the
//! user may have edited some of the same fields again. Each submitted field
//! is settled on its own:
//!
//! 1. If the field's sequence still equals the one captured at submission,
//!    nothing newer exists: adopt the server value (success) or restore the
//!    baseline (failure), and mark the field clean.
//! 2. Otherwise a newer edit supersedes the outcome: the displayed value is
//!    left alone and the field stays dirty. On success its baseline moves to
//!    the confirmed value so a later rollback lands on what the server holds.
//!
//! The outcome order between requests therefore never matters: only the
//! latest local edit of a field can settle it.

use crate::{DirtyTracker, FieldKey, FlushTicket, InFlight, Patch, Record, SaveFailure};
use serde::{Deserialize, Serialize};

/// What the persistence endpoint answered.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome<K: FieldKey> {
    /// Authoritative values for (a subset of) the submitted fields
    Saved(Patch<K>),
    /// The whole patch was declined or never arrived
    Failed(SaveFailure),
}

impl<K: FieldKey> From<Result<Patch<K>, SaveFailure>> for SaveOutcome<K> {
    fn from(result: Result<Patch<K>, SaveFailure>) -> Self {
        match result {
            Ok(values) => SaveOutcome::Saved(values),
            Err(failure) => SaveOutcome::Failed(failure),
        }
    }
}

/// Per-field result of settling one flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "K: FieldKey")]
pub struct ReconcileReport<K: FieldKey> {
    pub ticket: FlushTicket,
    /// Fields that took the server's value and are now clean
    pub adopted: Vec<K>,
    /// Fields restored to their baseline and now clean
    pub rolled_back: Vec<K>,
    /// Fields edited again while in flight; left dirty and untouched
    pub superseded: Vec<K>,
    /// Fields the server answered for but that were not submitted
    pub ignored: Vec<K>,
    /// The failure, if the flush failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SaveFailure>,
}

impl<K: FieldKey> ReconcileReport<K> {
    fn new(ticket: FlushTicket) -> Self {
        Self {
            ticket,
            adopted: Vec::new(),
            rolled_back: Vec::new(),
            superseded: Vec::new(),
            ignored: Vec::new(),
            failure: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Applies one outcome to a record and its dirty tracker.
pub struct Reconciler<'a, K: FieldKey> {
    record: &'a mut Record<K>,
    tracker: &'a mut DirtyTracker<K>,
}

impl<'a, K: FieldKey> Reconciler<'a, K> {
    pub fn new(record: &'a mut Record<K>, tracker: &'a mut DirtyTracker<K>) -> Self {
        Self { record, tracker }
    }

    /// Settle every field of `in_flight` against `outcome`.
    ///
    /// A superseded field keeps its newer value, but on success its baseline
    /// is rebased onto the confirmed value, so a later rollback restores what
    /// the server holds rather than the value from before the first edit.
    pub fn reconcile(self, in_flight: InFlight<K>, outcome: SaveOutcome<K>) -> ReconcileReport<K> {
        let mut report = ReconcileReport::new(in_flight.ticket);

        match outcome {
            SaveOutcome::Saved(mut values) => {
                for (key, submitted, seen) in in_flight.into_entries() {
                    // A server that omits a field confirms what it was sent
                    let confirmed = values.remove(&key).unwrap_or(submitted);
                    if self.tracker.is_current(key, seen) {
                        self.record.set(key, confirmed);
                        self.tracker.settle(key);
                        report.adopted.push(key);
                    } else {
                        self.tracker.rebase(key, confirmed);
                        report.superseded.push(key);
                    }
                }
                report.ignored.extend(values.into_keys());
            }
            SaveOutcome::Failed(failure) => {
                for (key, _, seen) in in_flight.into_entries() {
                    if self.tracker.is_current(key, seen) {
                        if let Some(baseline) = self.tracker.settle(key) {
                            self.record.set(key, baseline);
                        }
                        report.rolled_back.push(key);
                    } else {
                        report.superseded.push(key);
                    }
                }
                report.failure = Some(failure);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::test_fields::BoardField;
    use crate::FieldValue;
    use serde_json::json;

    struct Fixture {
        record: Record<BoardField>,
        tracker: DirtyTracker<BoardField>,
    }

    impl Fixture {
        fn new() -> Self {
            let record = Record::from_snapshot(
                "board-1",
                Patch::from([
                    (BoardField::Title, json!("Roadmap")),
                    (BoardField::Visibility, json!("team")),
                    (BoardField::Favorite, json!(false)),
                ]),
            )
            .unwrap();
            Self {
                record,
                tracker: DirtyTracker::new(),
            }
        }

        fn edit(&mut self, key: BoardField, value: FieldValue) {
            let current = self.record.get(key).cloned().unwrap_or_default();
            self.tracker.mark_dirty(key, &current);
            self.record.set(key, value);
        }

        fn submit(&self, keys: &[BoardField]) -> InFlight<BoardField> {
            InFlight {
                ticket: FlushTicket::new(1),
                patch: keys
                    .iter()
                    .map(|key| (*key, self.record.get(*key).cloned().unwrap_or_default()))
                    .collect(),
                sequences: self.tracker.snapshot_sequences(keys.iter().copied()),
                started_at: 0,
            }
        }

        fn reconcile(
            &mut self,
            in_flight: InFlight<BoardField>,
            outcome: SaveOutcome<BoardField>,
        ) -> ReconcileReport<BoardField> {
            Reconciler::new(&mut self.record, &mut self.tracker).reconcile(in_flight, outcome)
        }
    }

    #[test]
    fn success_adopts_server_value() {
        let mut fx = Fixture::new();
        fx.edit(BoardField::Title, json!("roadmap "));
        let in_flight = fx.submit(&[BoardField::Title]);

        // Server normalizes whitespace
        let report = fx.reconcile(
            in_flight,
            SaveOutcome::Saved(Patch::from([(BoardField::Title, json!("roadmap"))])),
        );

        assert_eq!(report.adopted, vec![BoardField::Title]);
        assert_eq!(fx.record.get(BoardField::Title), Some(&json!("roadmap")));
        assert!(fx.tracker.is_clean());
    }

    #[test]
    fn success_without_value_confirms_submitted() {
        let mut fx = Fixture::new();
        fx.edit(BoardField::Favorite, json!(true));
        let in_flight = fx.submit(&[BoardField::Favorite]);

        let report = fx.reconcile(in_flight, SaveOutcome::Saved(Patch::new()));

        assert_eq!(report.adopted, vec![BoardField::Favorite]);
        assert_eq!(fx.record.get(BoardField::Favorite), Some(&json!(true)));
        assert!(!fx.tracker.is_dirty(BoardField::Favorite));
    }

    #[test]
    fn success_superseded_keeps_newer_local_value() {
        let mut fx = Fixture::new();
        fx.edit(BoardField::Title, json!("v1"));
        let in_flight = fx.submit(&[BoardField::Title]);
        fx.edit(BoardField::Title, json!("v2"));

        let report = fx.reconcile(
            in_flight,
            SaveOutcome::Saved(Patch::from([(BoardField::Title, json!("v1"))])),
        );

        assert_eq!(report.superseded, vec![BoardField::Title]);
        assert!(report.adopted.is_empty());
        assert_eq!(fx.record.get(BoardField::Title), Some(&json!("v2")));
        assert!(fx.tracker.is_dirty(BoardField::Title));
        // Rollback target is now what the server confirmed
        assert_eq!(fx.tracker.baseline(BoardField::Title), Some(&json!("v1")));
    }

    #[test]
    fn failure_rolls_back_to_baseline() {
        let mut fx = Fixture::new();
        fx.edit(BoardField::Visibility, json!("public"));
        fx.edit(BoardField::Visibility, json!("private"));
        let in_flight = fx.submit(&[BoardField::Visibility]);

        let report = fx.reconcile(
            in_flight,
            SaveOutcome::Failed(SaveFailure::rejected("permission denied")),
        );

        assert_eq!(report.rolled_back, vec![BoardField::Visibility]);
        assert_eq!(
            report.failure,
            Some(SaveFailure::rejected("permission denied"))
        );
        assert_eq!(fx.record.get(BoardField::Visibility), Some(&json!("team")));
        assert!(fx.tracker.is_clean());
    }

    #[test]
    fn failure_superseded_keeps_newer_local_value() {
        let mut fx = Fixture::new();
        fx.edit(BoardField::Title, json!("v1"));
        let in_flight = fx.submit(&[BoardField::Title]);
        fx.edit(BoardField::Title, json!("v2"));

        let report = fx.reconcile(
            in_flight,
            SaveOutcome::Failed(SaveFailure::transport("timeout")),
        );

        assert_eq!(report.superseded, vec![BoardField::Title]);
        assert!(report.rolled_back.is_empty());
        assert_eq!(fx.record.get(BoardField::Title), Some(&json!("v2")));
        assert_eq!(fx.tracker.baseline(BoardField::Title), Some(&json!("Roadmap")));
    }

    #[test]
    fn independent_fields_settle_independently() {
        let mut fx = Fixture::new();
        fx.edit(BoardField::Title, json!("v1"));
        fx.edit(BoardField::Favorite, json!(true));
        let in_flight = fx.submit(&[BoardField::Title, BoardField::Favorite]);
        fx.edit(BoardField::Title, json!("v2"));

        let report = fx.reconcile(
            in_flight,
            SaveOutcome::Failed(SaveFailure::rejected("nope")),
        );

        assert_eq!(report.rolled_back, vec![BoardField::Favorite]);
        assert_eq!(report.superseded, vec![BoardField::Title]);
        assert_eq!(fx.record.get(BoardField::Favorite), Some(&json!(false)));
        assert_eq!(fx.record.get(BoardField::Title), Some(&json!("v2")));
    }

    #[test]
    fn unsubmitted_server_values_are_ignored() {
        let mut fx = Fixture::new();
        fx.edit(BoardField::Title, json!("v1"));
        let in_flight = fx.submit(&[BoardField::Title]);

        let report = fx.reconcile(
            in_flight,
            SaveOutcome::Saved(Patch::from([
                (BoardField::Title, json!("v1")),
                (BoardField::Visibility, json!("public")),
            ])),
        );

        assert_eq!(report.ignored, vec![BoardField::Visibility]);
        assert_eq!(fx.record.get(BoardField::Visibility), Some(&json!("team")));
    }

    #[test]
    fn outcome_from_result() {
        let ok: Result<Patch<BoardField>, SaveFailure> = Ok(Patch::new());
        assert_eq!(SaveOutcome::from(ok), SaveOutcome::Saved(Patch::new()));

        let err: Result<Patch<BoardField>, SaveFailure> = Err(SaveFailure::transport("x"));
        assert_eq!(
            SaveOutcome::from(err),
            SaveOutcome::Failed(SaveFailure::transport("x"))
        );
    }
}
