//! Allocation ledger API — list and assign.
//!
//! There is no unassign endpoint; ledger rows only disappear through the
//! project-delete cascade.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::db::AssetRef;

#[derive(Deserialize)]
pub(super) struct AllocationListQuery {
    project_id: Option<Uuid>,
}

pub(super) async fn handler_api_allocations_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AllocationListQuery>,
) -> impl IntoResponse {
    match state.db.get_allocations(params.project_id).await {
        Ok(allocations) => Json(serde_json::json!({ "allocations": allocations })).into_response(),
        Err(e) => super::write_error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateAllocationPayload {
    project_id: Uuid,
    asset_kind: String,
    asset_id: Uuid,
}

/// POST /api/allocations — assign one asset to a project.
///
/// The payload's `asset_kind` tag is mapped onto [`AssetRef`], so exactly
/// one reference column is ever populated. A dangling project or asset id
/// comes back as 422 from the foreign-key check; assigning a vehicle or
/// equipment item also flips its status to `in_use` in the same
/// transaction.
pub(super) async fn handler_api_allocations_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAllocationPayload>,
) -> impl IntoResponse {
    let asset = match AssetRef::from_kind(&payload.asset_kind, payload.asset_id) {
        Some(asset) => asset,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!(
                        "Invalid asset_kind: {} (expected worker, vehicle, or equipment)",
                        payload.asset_kind
                    )
                })),
            )
                .into_response();
        }
    };

    match state.db.assign(payload.project_id, asset).await {
        Ok(row) => {
            info!(
                allocation_id = %row.id,
                project_id = %payload.project_id,
                asset_kind = asset.kind(),
                asset_id = %asset.id(),
                "asset assigned"
            );
            state.refresh_and_broadcast().await;
            (StatusCode::CREATED, Json(serde_json::json!(row))).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}
