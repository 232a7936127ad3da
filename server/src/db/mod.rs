//! Database module for PostgreSQL persistence.

mod pool;
mod records;
mod watchers;

pub use pool::*;
pub use records::*;
pub use watchers::*;
