//! # Fieldsync Client
//!
//! Tokio runtime around [`fieldsync_engine`]: one actor task per record and
//! editor session owns a [`FieldSynchronizer`](fieldsync_engine::FieldSynchronizer),
//! arms its timers, calls a [`PersistenceEndpoint`] and publishes a
//! [`SyncView`](fieldsync_engine::SyncView) the display layer can watch.
//!
//! ```rust,no_run
//! use fieldsync_client::{ClientConfig, HttpEndpoint, SyncHandle};
//! # use fieldsync_engine::FieldKey;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
//! # #[serde(rename_all = "camelCase")]
//! # enum Board { Title }
//! # impl FieldKey for Board {
//! #     const ALL: &'static [Self] = &[Board::Title];
//! #     fn name(self) -> &'static str { "title" }
//! # }
//! use std::sync::Arc;
//!
//! # async fn run() -> fieldsync_client::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let endpoint = Arc::new(HttpEndpoint::from_config(&config)?);
//!
//! let snapshot = endpoint.fetch_record::<Board>("board-1").await?;
//! let handle = SyncHandle::spawn("board-1", snapshot, config.sync, endpoint)?;
//!
//! handle.apply_edit(Board::Title, "Roadmap")?;
//! let mut views = handle.subscribe();
//! views.changed().await.ok();
//! println!("{}", views.borrow().status_line);
//!
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod watch;

pub use config::{ClientConfig, ConfigError, DEFAULT_REQUEST_TIMEOUT_MS};
pub use driver::SyncHandle;
pub use endpoint::{PersistenceEndpoint, WatchEndpoint};
pub use error::{ClientError, Result};
pub use http::HttpEndpoint;
pub use watch::WatchHandle;
