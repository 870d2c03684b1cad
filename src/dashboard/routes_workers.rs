//! Worker roster API — list, create, delete.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::db::{NewWorker, WorkerStatus};

pub(super) async fn handler_api_workers_list(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.db.get_workers().await {
        Ok(workers) => Json(serde_json::json!({ "workers": workers })).into_response(),
        Err(e) => super::write_error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateWorkerPayload {
    name: String,
    role: String,
    email: Option<String>,
    phone: Option<String>,
    status: Option<String>,
}

/// POST /api/workers — add a worker to the roster.
pub(super) async fn handler_api_workers_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateWorkerPayload>,
) -> impl IntoResponse {
    let status = match payload.status.as_deref() {
        None => None,
        Some(s) => match WorkerStatus::parse(s) {
            Some(parsed) => Some(parsed),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("Invalid worker status: {}", s)})),
                )
                    .into_response();
            }
        },
    };

    let new = NewWorker {
        name: payload.name,
        role: payload.role,
        email: payload.email,
        phone: payload.phone,
        status,
    };
    match state.db.insert_worker(&new).await {
        Ok(row) => {
            info!(id = %row.id, name = %row.name, "worker created");
            state.refresh_and_broadcast().await;
            (StatusCode::CREATED, Json(serde_json::json!(row))).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}

/// DELETE /api/workers/{id} — remove a worker. Deleting an id that does
/// not exist reports zero rows rather than an error.
pub(super) async fn handler_api_workers_delete(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<Uuid>,
) -> impl IntoResponse {
    match state.db.delete_worker(id).await {
        Ok(deleted) => {
            info!(id = %id, deleted, "worker delete");
            state.refresh_and_broadcast().await;
            Json(serde_json::json!({"ok": true, "deleted": deleted})).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}
