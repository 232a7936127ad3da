//! WebSocket change notifications.
//!
//! Clients subscribe to records over a socket and are pushed field and
//! watcher-count changes as other members save them.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
