//! Watch flag handlers.

use fieldsync_engine::WatchState;
use sqlx::PgPool;

use crate::db;
use crate::error::{AppError, Result};
use crate::websocket::{ConnectionManager, ServerMessage};

/// Current watch state of a record for `member`.
pub async fn handle_get_watch(pool: &PgPool, record_id: &str, member: &str) -> Result<WatchState> {
    if !db::record_exists(pool, record_id).await? {
        return Err(AppError::NotFound(format!("unknown record: {record_id}")));
    }
    Ok(db::watch_state(pool, record_id, member).await?)
}

/// Set `member`'s watch flag and answer with the resulting state.
pub async fn handle_set_watch(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    record_id: &str,
    member: &str,
    watching: bool,
) -> Result<WatchState> {
    if let Err(e) = db::set_watching(pool, record_id, member, watching).await {
        if is_foreign_key_violation(&e) {
            return Err(AppError::NotFound(format!("unknown record: {record_id}")));
        }
        return Err(e.into());
    }

    let state = db::watch_state(pool, record_id, member).await?;
    tracing::debug!(
        record_id = %record_id,
        member = %member,
        watching = state.watching,
        count = state.count,
        "Watch flag set"
    );

    conn_manager.broadcast_record(
        record_id,
        ServerMessage::WatchChanged {
            record_id: record_id.to_string(),
            count: state.count,
        },
    );

    Ok(state)
}

/// Check if a SQL error is a foreign key violation.
fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        // PostgreSQL foreign key violation code is "23503"
        db_err.code().map(|c| c == "23503").unwrap_or(false)
    } else {
        false
    }
}
