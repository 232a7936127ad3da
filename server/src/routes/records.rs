//! Record endpoint routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use fieldsync_engine::{RecordValues, SaveRequest, SaveResponse, WatchRequest, WatchState};

use crate::auth::Member;
use crate::db::StoredRecord;
use crate::error::Result;
use crate::handlers::{
    handle_get_record, handle_get_watch, handle_replace_record, handle_save, handle_set_watch,
};
use crate::AppState;

/// Create record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/records/{id}", get(get_handler).put(replace_handler))
        .route("/records/{id}/save", post(save_handler))
        .route("/records/{id}/watch", get(get_watch_handler).put(set_watch_handler))
}

/// POST /records/{id}/save - Apply a partial patch.
async fn save_handler(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    _member: Member,
    payload: std::result::Result<Json<SaveRequest<String>>, JsonRejection>,
) -> Result<Json<SaveResponse<String>>> {
    let Json(request) = payload?;
    let response = handle_save(
        &state.pool,
        &state.conn_manager,
        &record_id,
        request,
        state.config.max_patch_fields,
    )
    .await?;
    Ok(Json(response))
}

/// GET /records/{id} - Fetch the full record.
async fn get_handler(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    _member: Member,
) -> Result<Json<StoredRecord>> {
    let record = handle_get_record(&state.pool, &record_id).await?;
    Ok(Json(record))
}

/// PUT /records/{id} - Seed or replace a record.
async fn replace_handler(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    _member: Member,
    payload: std::result::Result<Json<RecordValues<String>>, JsonRejection>,
) -> Result<Json<StoredRecord>> {
    let Json(body) = payload?;
    let record = handle_replace_record(&state.pool, &state.conn_manager, &record_id, body).await?;
    Ok(Json(record))
}

/// GET /records/{id}/watch - Watch state for the calling member.
async fn get_watch_handler(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    member: Member,
) -> Result<Json<WatchState>> {
    let watch = handle_get_watch(&state.pool, &record_id, &member.id).await?;
    Ok(Json(watch))
}

/// PUT /records/{id}/watch - Set the calling member's watch flag.
async fn set_watch_handler(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    member: Member,
    payload: std::result::Result<Json<WatchRequest>, JsonRejection>,
) -> Result<Json<WatchState>> {
    let Json(request) = payload?;
    let watch = handle_set_watch(
        &state.pool,
        &state.conn_manager,
        &record_id,
        &member.id,
        request.watching,
    )
    .await?;
    Ok(Json(watch))
}
