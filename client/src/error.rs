//! Client error types.

use crate::config::ConfigError;

/// Errors surfaced by the client API.
///
/// Save failures are not errors here: they are reconciled by the engine and
/// show up in the published view.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("sync driver has shut down")]
    Closed,

    #[error(transparent)]
    Engine(#[from] fieldsync_engine::Error),

    #[error("endpoint call failed: {0}")]
    Endpoint(#[from] fieldsync_engine::SaveFailure),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint answered {status}: {message}")]
    Status { status: u16, message: String },
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
