//! Configuration management for the client.

use fieldsync_engine::{SyncConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_SAVED_DISPLAY_MS};
use std::env;
use std::time::Duration;

/// Default timeout of a single endpoint request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the persistence endpoint, e.g. `http://localhost:3000`
    pub endpoint_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Debounce and status timings for the engine
    pub sync: SyncConfig,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            auth_token: None,
            sync: SyncConfig::default(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint_url = lookup("FIELDSYNC_ENDPOINT_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingEndpointUrl)?;

        let auth_token = lookup("FIELDSYNC_AUTH_TOKEN").filter(|token| !token.is_empty());

        let debounce_ms = parse_ms(&lookup, "FIELDSYNC_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?;
        let saved_display_ms =
            parse_ms(&lookup, "FIELDSYNC_SAVED_DISPLAY_MS", DEFAULT_SAVED_DISPLAY_MS)?;
        let request_timeout_ms = parse_ms(
            &lookup,
            "FIELDSYNC_REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?;

        Ok(Self {
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            auth_token,
            sync: SyncConfig::default()
                .with_debounce_ms(debounce_ms)
                .with_saved_display_ms(saved_display_ms),
            request_timeout_ms,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_ms<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidMillis { name, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("FIELDSYNC_ENDPOINT_URL environment variable is required")]
    MissingEndpointUrl,

    #[error("Invalid {name} value: {value:?}")]
    InvalidMillis { name: &'static str, value: String },
}
