//! Driver tests on a paused clock.

mod common;

use common::{
    config, ms, snapshot, Field, Reply, ScriptedEndpoint, DEBOUNCE_MS, LATENCY_MS,
    SAVED_DISPLAY_MS,
};
use fieldsync_client::{ClientError, SyncHandle};
use fieldsync_engine::{Patch, SaveFailure, SaveStatus};
use serde_json::json;
use std::sync::Arc;
use tokio::time::sleep;

fn spawn(endpoint: &Arc<ScriptedEndpoint>) -> SyncHandle<Field> {
    SyncHandle::spawn("board-1", snapshot(), config(), Arc::clone(endpoint)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn burst_is_coalesced_into_one_save() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let handle = spawn(&endpoint);

    for title in ["R", "Ro", "Road", "Roadmap 2"] {
        handle.apply_edit(Field::Title, title).unwrap();
        sleep(ms(DEBOUNCE_MS / 4)).await;
    }

    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.status, SaveStatus::Saving);
    assert_eq!(view.values[&Field::Title], json!("Roadmap 2"));
    assert!(endpoint.calls().is_empty());

    sleep(ms(DEBOUNCE_MS + LATENCY_MS + 10)).await;

    assert_eq!(
        endpoint.calls(),
        vec![Patch::from([(Field::Title, json!("Roadmap 2"))])]
    );
    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.status, SaveStatus::Saved);
    assert!(view.pending_keys.is_empty());
}

#[tokio::test(start_paused = true)]
async fn edit_during_flight_is_not_clobbered() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let handle = spawn(&endpoint);

    handle.apply_edit(Field::Title, "v2").unwrap();
    handle.flush_now().unwrap();
    sleep(ms(LATENCY_MS / 2)).await;

    handle.apply_edit(Field::Title, "v3").unwrap();
    let view = handle.snapshot().await.unwrap();
    assert!(view.flushing);
    assert_eq!(view.values[&Field::Title], json!("v3"));

    sleep(ms(LATENCY_MS * 3)).await;

    assert_eq!(
        endpoint.calls(),
        vec![
            Patch::from([(Field::Title, json!("v2"))]),
            Patch::from([(Field::Title, json!("v3"))]),
        ]
    );
    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.values[&Field::Title], json!("v3"));
    assert!(view.pending_keys.is_empty());
    assert_eq!(view.status, SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn rejection_rolls_back_and_reports_error() {
    let endpoint = Arc::new(ScriptedEndpoint::with_script(vec![Reply::Fail(
        SaveFailure::rejected("board is archived"),
    )]));
    let handle = spawn(&endpoint);

    handle.apply_edit(Field::Visibility, "public").unwrap();
    handle.flush_now().unwrap();
    sleep(ms(LATENCY_MS * 2)).await;

    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.values[&Field::Visibility], json!("team"));
    assert_eq!(view.status, SaveStatus::Error);
    assert_eq!(view.status_line, "error: board is archived");
    assert_eq!(handle.last_error().as_deref(), Some("board is archived"));

    // No retry happens on its own
    sleep(ms(DEBOUNCE_MS * 10)).await;
    assert_eq!(endpoint.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn panicking_endpoint_counts_as_transport_failure() {
    let endpoint = Arc::new(ScriptedEndpoint::with_script(vec![Reply::Panic]));
    let handle = spawn(&endpoint);

    handle.apply_edit(Field::Favorite, true).unwrap();
    handle.flush_now().unwrap();
    sleep(ms(LATENCY_MS * 2)).await;

    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.values[&Field::Favorite], json!(false));
    assert_eq!(view.status, SaveStatus::Error);
    assert!(view.last_error.unwrap().starts_with("save task failed"));

    // The driver survived and saves the next edit
    handle.apply_edit(Field::Favorite, true).unwrap();
    handle.flush_now().unwrap();
    sleep(ms(LATENCY_MS * 2)).await;
    assert_eq!(handle.snapshot().await.unwrap().status, SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn server_values_are_adopted() {
    let endpoint = Arc::new(ScriptedEndpoint::with_script(vec![Reply::Values(
        Patch::from([(Field::Title, json!("Roadmap (trimmed)"))]),
    )]));
    let handle = spawn(&endpoint);

    handle.apply_edit(Field::Title, "  Roadmap (trimmed)  ").unwrap();
    handle.flush_now().unwrap();
    sleep(ms(LATENCY_MS * 2)).await;

    assert_eq!(
        handle.snapshot().await.unwrap().values[&Field::Title],
        json!("Roadmap (trimmed)")
    );
}

#[tokio::test(start_paused = true)]
async fn saved_reverts_to_idle() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let handle = spawn(&endpoint);

    handle.apply_edit(Field::Title, "x").unwrap();
    sleep(ms(DEBOUNCE_MS + LATENCY_MS + 1)).await;
    assert_eq!(handle.snapshot().await.unwrap().status, SaveStatus::Saved);

    sleep(ms(SAVED_DISPLAY_MS)).await;
    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.status, SaveStatus::Idle);
    assert_eq!(view.status_line, "idle");
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_changes() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let handle = spawn(&endpoint);
    let mut views = handle.subscribe();

    handle.apply_edit(Field::Title, "x").unwrap();
    views.changed().await.unwrap();
    assert_eq!(views.borrow_and_update().status, SaveStatus::Saving);
    assert_eq!(handle.pending_keys(), vec![Field::Title]);
    assert_eq!(handle.value(Field::Title), Some(json!("x")));

    loop {
        views.changed().await.unwrap();
        if views.borrow_and_update().status == SaveStatus::Saved {
            break;
        }
    }
    assert_eq!(handle.save_status(), SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn authoritative_values_wait_for_confirmation() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let handle = spawn(&endpoint);

    handle.apply_edit(Field::Title, "mine").unwrap();
    let err = handle
        .apply_authoritative(Patch::from([(Field::Visibility, json!("private"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Engine(_)));

    handle.flush_now().unwrap();
    sleep(ms(LATENCY_MS * 2)).await;

    handle
        .apply_authoritative(Patch::from([(Field::Visibility, json!("private"))]))
        .await
        .unwrap();
    assert_eq!(handle.value(Field::Visibility), Some(json!("private")));
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_queued_edits() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let handle = spawn(&endpoint);
    let other = handle.clone();

    handle.apply_edit(Field::Title, "last words").unwrap();
    handle.shutdown().await.unwrap();

    // Sent right away, not after the debounce, and settled before returning
    assert_eq!(
        endpoint.calls(),
        vec![Patch::from([(Field::Title, json!("last words"))])]
    );
    assert_eq!(other.view().status, SaveStatus::Saved);
    assert!(matches!(
        other.apply_edit(Field::Title, "too late"),
        Err(ClientError::Closed)
    ));
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_flushes() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let handle = spawn(&endpoint);

    handle.apply_edit(Field::Favorite, true).unwrap();
    drop(handle);
    sleep(ms(LATENCY_MS * 2)).await;

    assert_eq!(
        endpoint.calls(),
        vec![Patch::from([(Field::Favorite, json!(true))])]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_snapshot_field_fails_to_spawn() {
    let endpoint = Arc::new(ScriptedEndpoint::new());
    let result = SyncHandle::spawn(
        "board-1",
        Patch::from([(Field::Title, json!("only title"))]),
        config(),
        endpoint,
    );
    assert!(matches!(result, Err(ClientError::Engine(_))));
}
