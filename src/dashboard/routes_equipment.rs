//! Equipment inventory API — list, create, delete.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::db::{AssetStatus, NewEquipment};

pub(super) async fn handler_api_equipment_list(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.db.get_equipment().await {
        Ok(equipment) => Json(serde_json::json!({ "equipment": equipment })).into_response(),
        Err(e) => super::write_error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateEquipmentPayload {
    name: String,
    kind: Option<String>,
    serial_number: Option<String>,
    status: Option<String>,
}

/// POST /api/equipment — add an equipment item. A duplicate serial number
/// comes back as 409 from the unique constraint.
pub(super) async fn handler_api_equipment_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateEquipmentPayload>,
) -> impl IntoResponse {
    let status = match payload.status.as_deref() {
        None => None,
        Some(s) => match AssetStatus::parse(s) {
            Some(parsed) => Some(parsed),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("Invalid equipment status: {}", s)})),
                )
                    .into_response();
            }
        },
    };

    let new = NewEquipment {
        name: payload.name,
        kind: payload.kind,
        serial_number: payload.serial_number,
        status,
    };
    match state.db.insert_equipment(&new).await {
        Ok(row) => {
            info!(id = %row.id, name = %row.name, "equipment created");
            state.refresh_and_broadcast().await;
            (StatusCode::CREATED, Json(serde_json::json!(row))).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}

/// DELETE /api/equipment/{id} — remove an equipment item. Allocations
/// referencing it keep their rows with the reference nulled by the schema.
pub(super) async fn handler_api_equipment_delete(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<Uuid>,
) -> impl IntoResponse {
    match state.db.delete_equipment(id).await {
        Ok(deleted) => {
            info!(id = %id, deleted, "equipment delete");
            state.refresh_and_broadcast().await;
            Json(serde_json::json!({"ok": true, "deleted": deleted})).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}
