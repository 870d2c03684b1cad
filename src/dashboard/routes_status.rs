//! Snapshot endpoints and the bare-bones index.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use super::AppState;

/// GET /api/snapshot — the five collections as of the last completed
/// refresh, plus its timestamp.
pub(super) async fn handler_api_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.snapshot.get();
    Json(serde_json::json!({ "snapshot": &*snap }))
}

/// POST /api/snapshot/refresh — force a full reload. Idempotent; a reload
/// already in flight just absorbs the request.
pub(super) async fn handler_api_snapshot_refresh(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.refresh_and_broadcast().await;
    let snap = state.snapshot.get();
    Json(serde_json::json!({ "ok": true, "refreshed_at": snap.refreshed_at }))
}

/// GET / — minimal service descriptor when no static frontend is mounted.
pub(super) async fn handler_index() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "opsdeck",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
