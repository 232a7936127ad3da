//! Error types for the fieldsync engine.

use crate::{FlushTicket, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All possible errors from the engine API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Seeding errors
    #[error("snapshot for record {record_id} is missing field: {field}")]
    MissingField {
        record_id: RecordId,
        field: &'static str,
    },

    // Flush errors
    #[error("no flush in flight with ticket {0}")]
    UnknownFlush(FlushTicket),

    // Authoritative replacement errors
    #[error("record {record_id} has unconfirmed edits on: {}", fields.join(", "))]
    UnconfirmedEdits {
        record_id: RecordId,
        fields: Vec<&'static str>,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a save did not go through.
///
/// The engine reconciles both kinds the same way; the distinction only
/// matters for logs and for the display layer.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum SaveFailure {
    /// The endpoint declined the patch (permission denied, validation).
    #[error("{0}")]
    Rejected(String),

    /// The request never produced an answer (network, timeout, crash).
    #[error("{0}")]
    Transport(String),
}

impl SaveFailure {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// The human readable message, without the kind.
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected(message) | Self::Transport(message) => message,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
