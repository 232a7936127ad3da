//! Shared mocks for client tests.

#![allow(dead_code)]

use async_trait::async_trait;
use fieldsync_client::{PersistenceEndpoint, WatchEndpoint};
use fieldsync_engine::{FieldKey, Patch, SaveFailure, SyncConfig, WatchState};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub const DEBOUNCE_MS: u64 = 300;
pub const SAVED_DISPLAY_MS: u64 = 1_000;
pub const LATENCY_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Visibility,
    Favorite,
}

impl FieldKey for Field {
    const ALL: &'static [Self] = &[Field::Title, Field::Visibility, Field::Favorite];

    fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Visibility => "visibility",
            Field::Favorite => "favorite",
        }
    }
}

pub fn config() -> SyncConfig {
    SyncConfig::default()
        .with_debounce_ms(DEBOUNCE_MS)
        .with_saved_display_ms(SAVED_DISPLAY_MS)
}

pub fn snapshot() -> Patch<Field> {
    Patch::from([
        (Field::Title, json!("Roadmap")),
        (Field::Visibility, json!("team")),
        (Field::Favorite, json!(false)),
    ])
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// What the scripted endpoint does with the next save.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Confirm the submitted values
    Echo,
    /// Confirm with these values instead
    Values(Patch<Field>),
    Fail(SaveFailure),
    Panic,
}

/// Persistence endpoint answering from a script, `Echo` once it runs dry.
pub struct ScriptedEndpoint {
    latency: Duration,
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Patch<Field>>>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<Reply>) -> Self {
        Self {
            latency: ms(LATENCY_MS),
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Patch<Field>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceEndpoint<Field> for ScriptedEndpoint {
    async fn save(
        &self,
        _record_id: &str,
        patch: Patch<Field>,
    ) -> Result<Patch<Field>, SaveFailure> {
        self.calls.lock().unwrap().push(patch.clone());
        let reply = self.script.lock().unwrap().pop_front().unwrap_or(Reply::Echo);
        tokio::time::sleep(self.latency).await;
        match reply {
            Reply::Echo => Ok(patch),
            Reply::Values(values) => Ok(values),
            Reply::Fail(failure) => Err(failure),
            Reply::Panic => panic!("endpoint crashed"),
        }
    }
}

/// Watch endpoint holding the authoritative state of one member.
pub struct MockWatch {
    state: Mutex<WatchState>,
    latencies: Mutex<VecDeque<Duration>>,
    failures: Mutex<VecDeque<bool>>,
    fetches: Mutex<usize>,
}

impl MockWatch {
    pub fn new(state: WatchState) -> Self {
        Self {
            state: Mutex::new(state),
            latencies: Mutex::new(VecDeque::new()),
            failures: Mutex::new(VecDeque::new()),
            fetches: Mutex::new(0),
        }
    }

    pub fn with_latencies(self, latencies: &[u64]) -> Self {
        *self.latencies.lock().unwrap() = latencies.iter().map(|l| ms(*l)).collect();
        self
    }

    /// Fail the n-th toggle call for every `true` entry.
    pub fn with_failures(self, failures: &[bool]) -> Self {
        *self.failures.lock().unwrap() = failures.iter().copied().collect();
        self
    }

    pub fn state(&self) -> WatchState {
        *self.state.lock().unwrap()
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl WatchEndpoint for MockWatch {
    async fn set_watching(&self, _record_id: &str, watching: bool) -> Result<(), SaveFailure> {
        let latency = self
            .latencies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ms(LATENCY_MS));
        let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);
        tokio::time::sleep(latency).await;

        if fail {
            return Err(SaveFailure::transport("connection reset"));
        }
        let mut state = self.state.lock().unwrap();
        if state.watching != watching {
            state.watching = watching;
            state.count = if watching {
                state.count + 1
            } else {
                state.count.saturating_sub(1)
            };
        }
        Ok(())
    }

    async fn fetch_watch(&self, _record_id: &str) -> Result<WatchState, SaveFailure> {
        *self.fetches.lock().unwrap() += 1;
        tokio::time::sleep(ms(LATENCY_MS)).await;
        Ok(self.state())
    }
}
