//! Record handlers: the save contract plus seeding and fetching whole records.

use fieldsync_engine::{RecordValues, SaveRequest, SaveResponse};
use sqlx::PgPool;

use crate::db::{self, Fields, PatchOutcome, StoredRecord};
use crate::error::{AppError, Result};
use crate::websocket::{ConnectionManager, ServerMessage};

/// Check a patch against the request limits before touching the database.
///
/// Returns the rejection reason.
pub fn validate_patch(patch: &Fields, max_fields: usize) -> std::result::Result<(), String> {
    if patch.is_empty() {
        return Err("patch is empty".to_string());
    }
    if patch.len() > max_fields {
        return Err(format!(
            "patch has {} fields; at most {} allowed",
            patch.len(),
            max_fields
        ));
    }
    Ok(())
}

/// Process a save call.
///
/// A declined save is still a successful exchange: it is answered with
/// `{"ok":false}` so the client can roll back, not retry.
pub async fn handle_save(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    record_id: &str,
    request: SaveRequest<String>,
    max_fields: usize,
) -> Result<SaveResponse<String>> {
    let outcome = match validate_patch(&request.patch, max_fields) {
        Ok(()) => db::apply_patch(pool, record_id, &request.patch).await?,
        Err(reason) => PatchOutcome::Rejected(reason),
    };

    match outcome {
        PatchOutcome::Saved { values, version } => {
            let notified = conn_manager.broadcast_record(
                record_id,
                ServerMessage::RecordChanged {
                    record_id: record_id.to_string(),
                    values: values.clone(),
                    version,
                },
            );
            tracing::info!(
                record_id = %record_id,
                fields = values.len(),
                version,
                notified,
                "Saved patch"
            );
            Ok(SaveResponse::saved(values))
        }
        PatchOutcome::Rejected(reason) => {
            tracing::info!(record_id = %record_id, reason = %reason, "Rejected patch");
            Ok(SaveResponse::rejected(reason))
        }
    }
}

/// Fetch the full record.
pub async fn handle_get_record(pool: &PgPool, record_id: &str) -> Result<StoredRecord> {
    db::get_record(pool, record_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("unknown record: {record_id}")))
}

/// Seed a record or replace all of its fields.
pub async fn handle_replace_record(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    record_id: &str,
    body: RecordValues<String>,
) -> Result<StoredRecord> {
    let record = db::upsert_record(pool, record_id, &body.values).await?;

    tracing::info!(
        record_id = %record_id,
        fields = record.fields.len(),
        version = record.version,
        "Replaced record"
    );
    conn_manager.broadcast_record(
        record_id,
        ServerMessage::RecordChanged {
            record_id: record.record_id.clone(),
            values: record.fields.clone(),
            version: record.version,
        },
    );

    Ok(record)
}
