//! Request handlers for the persistence endpoint.

mod records;
mod watch;
mod websocket;

pub use records::*;
pub use watch::*;
pub use websocket::*;
