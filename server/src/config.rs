//! Configuration management for the server.

use std::env;

/// Default upper bound on the number of fields in one save.
pub const DEFAULT_MAX_PATCH_FIELDS: usize = 64;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// When set, requests must carry a bearer token; otherwise anonymous
    /// access is allowed
    pub auth_secret: Option<String>,
    /// Saves with more fields than this are rejected
    pub max_patch_fields: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let auth_secret = env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty());

        let max_patch_fields = match env::var("MAX_PATCH_FIELDS") {
            Ok(raw) => raw
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxPatchFields)?,
            Err(_) => DEFAULT_MAX_PATCH_FIELDS,
        };

        Ok(Self {
            host,
            port,
            database_url,
            auth_secret,
            max_patch_fields,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("MAX_PATCH_FIELDS must be a positive integer")]
    InvalidMaxPatchFields,
}
