//! Vehicle fleet API — list, create, delete.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::db::{AssetStatus, NewVehicle};

pub(super) async fn handler_api_vehicles_list(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.db.get_vehicles().await {
        Ok(vehicles) => Json(serde_json::json!({ "vehicles": vehicles })).into_response(),
        Err(e) => super::write_error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateVehiclePayload {
    name: String,
    kind: Option<String>,
    license_plate: Option<String>,
    status: Option<String>,
}

/// POST /api/vehicles — add a vehicle. A duplicate license plate comes
/// back as 409 from the unique constraint.
pub(super) async fn handler_api_vehicles_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVehiclePayload>,
) -> impl IntoResponse {
    let status = match payload.status.as_deref() {
        None => None,
        Some(s) => match AssetStatus::parse(s) {
            Some(parsed) => Some(parsed),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("Invalid vehicle status: {}", s)})),
                )
                    .into_response();
            }
        },
    };

    let new = NewVehicle {
        name: payload.name,
        kind: payload.kind,
        license_plate: payload.license_plate,
        status,
    };
    match state.db.insert_vehicle(&new).await {
        Ok(row) => {
            info!(id = %row.id, name = %row.name, "vehicle created");
            state.refresh_and_broadcast().await;
            (StatusCode::CREATED, Json(serde_json::json!(row))).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}

/// DELETE /api/vehicles/{id} — remove a vehicle. Allocations referencing
/// it keep their rows with the reference nulled by the schema.
pub(super) async fn handler_api_vehicles_delete(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<Uuid>,
) -> impl IntoResponse {
    match state.db.delete_vehicle(id).await {
        Ok(deleted) => {
            info!(id = %id, deleted, "vehicle delete");
            state.refresh_and_broadcast().await;
            Json(serde_json::json!({"ok": true, "deleted": deleted})).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}
