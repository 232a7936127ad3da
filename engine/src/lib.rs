//! # Fieldsync Engine
//!
//! A deterministic engine for "edit now, persist later" controls.
//!
//! This crate keeps a locally edited view of a record consistent with a
//! remote authoritative store. Edits show up immediately, are debounced into
//! a single patch, and the endpoint's answer is reconciled field by field
//! without ever overwriting an edit the user made while the request was in
//! flight.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never sleeps, spawns or calls the network; the
//!   caller performs the requests it hands out
//! - **Deterministic**: time is an argument, so the same calls always
//!   produce the same state
//! - **One instance per record and editor session**: no global state
//! - **Latest local edit wins**: outcomes settle a field only if it was not
//!   edited again since the request was built
//!
//! ## Core Concepts
//!
//! ### Fields
//!
//! A record's fields form a closed enum implementing [`FieldKey`]. Patches
//! are [`Patch`] maps keyed by that enum.
//!
//! ### Sequences and baselines
//!
//! The [`DirtyTracker`] bumps a per-field [`EditSeq`] on every edit and keeps
//! the pre-edit baseline of each dirty field for rollback.
//!
//! ### Flushing
//!
//! [`FlushPhase`] is the scheduler state machine: idle, debounce armed, or
//! one request in flight. [`FieldSynchronizer`] hands out [`FlushRequest`]s
//! and takes their [`SaveOutcome`]s back; the [`Reconciler`] settles each
//! field against its sequence.
//!
//! ### Counter toggles
//!
//! [`CounterToggle`] handles a boolean with a derived count (watch +
//! watchers) by counting requests in flight and refetching once they drain.
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldsync_engine::{FieldKey, FieldSynchronizer, Patch, SaveOutcome, SaveStatus, SyncConfig};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! enum Board {
//!     Title,
//!     Favorite,
//! }
//!
//! impl FieldKey for Board {
//!     const ALL: &'static [Self] = &[Board::Title, Board::Favorite];
//!
//!     fn name(self) -> &'static str {
//!         match self {
//!             Board::Title => "title",
//!             Board::Favorite => "favorite",
//!         }
//!     }
//! }
//!
//! // 1. Seed from the server's snapshot
//! let snapshot = Patch::from([(Board::Title, json!("Roadmap")), (Board::Favorite, json!(false))]);
//! let mut sync = FieldSynchronizer::new("board-1", snapshot, SyncConfig::default()).unwrap();
//!
//! // 2. Edit: visible at once, flush scheduled after the debounce
//! let deadline = sync.apply_edit(Board::Favorite, json!(true), 0).unwrap();
//! assert_eq!(sync.value(Board::Favorite), Some(&json!(true)));
//!
//! // 3. The timer fires: send the request
//! let request = sync.tick(deadline).unwrap();
//!
//! // 4. Report the endpoint's answer
//! let settlement = sync
//!     .complete_flush(request.ticket, SaveOutcome::Saved(request.patch.clone()), deadline + 40)
//!     .unwrap();
//! assert!(settlement.next.is_none());
//! assert_eq!(sync.save_status(), SaveStatus::Saved);
//! assert!(sync.pending_keys().is_empty());
//! ```

pub mod config;
pub mod counter;
pub mod error;
pub mod field;
pub mod protocol;
pub mod reconcile;
pub mod record;
pub mod schedule;
pub mod sequence;
pub mod status;
pub mod synchronizer;
pub mod tracker;
pub mod view;

// Re-export main types at crate root
pub use config::{SyncConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_SAVED_DISPLAY_MS};
pub use counter::{CounterToggle, ToggleRequest, ToggleSettlement, ToggleView, WatchState};
pub use error::{Error, SaveFailure};
pub use field::{key_names, FieldKey, FieldValue, Patch};
pub use protocol::{RecordValues, SaveRequest, SaveResponse, WatchRequest};
pub use reconcile::{ReconcileReport, Reconciler, SaveOutcome};
pub use record::Record;
pub use schedule::{FlushPhase, FlushRequest, FlushTicket, InFlight};
pub use sequence::{EditSeq, SequenceMap};
pub use status::{Aftermath, SaveStatus, StatusMachine};
pub use synchronizer::{FieldSynchronizer, Settlement};
pub use tracker::DirtyTracker;
pub use view::SyncView;

/// Type aliases for clarity
pub type RecordId = String;
pub type Timestamp = u64;
