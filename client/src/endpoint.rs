//! Endpoint traits the drivers call.
//!
//! Implementations:
//! - [`HttpEndpoint`](crate::HttpEndpoint): the reference server over HTTP
//! - anything else that can persist a patch (tests use in-memory mocks)

use async_trait::async_trait;
use fieldsync_engine::{FieldKey, Patch, SaveFailure, WatchState};

/// Persists field patches of a record.
#[async_trait]
pub trait PersistenceEndpoint<K: FieldKey>: Send + Sync {
    /// Apply `patch` and return the authoritative values of the saved keys.
    ///
    /// Keys missing from the answer are taken as saved with the submitted
    /// value; extra keys are ignored.
    async fn save(&self, record_id: &str, patch: Patch<K>) -> Result<Patch<K>, SaveFailure>;
}

/// Per-member watch flag of a record.
#[async_trait]
pub trait WatchEndpoint: Send + Sync {
    async fn set_watching(&self, record_id: &str, watching: bool) -> Result<(), SaveFailure>;

    /// Authoritative flag and watcher count.
    async fn fetch_watch(&self, record_id: &str) -> Result<WatchState, SaveFailure>;
}
