//! Project API — list, create, delete.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::db::{NewProject, ProjectStatus};

pub(super) async fn handler_api_projects_list(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.db.get_projects().await {
        Ok(projects) => Json(serde_json::json!({ "projects": projects })).into_response(),
        Err(e) => super::write_error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct CreateProjectPayload {
    name: String,
    description: Option<String>,
    location: Option<String>,
    status: Option<String>,
    start_date: Option<chrono::NaiveDate>,
    end_date: Option<chrono::NaiveDate>,
}

/// POST /api/projects — create a project.
pub(super) async fn handler_api_projects_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProjectPayload>,
) -> impl IntoResponse {
    let status = match payload.status.as_deref() {
        None => None,
        Some(s) => match ProjectStatus::parse(s) {
            Some(parsed) => Some(parsed),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("Invalid project status: {}", s)})),
                )
                    .into_response();
            }
        },
    };

    let new = NewProject {
        name: payload.name,
        description: payload.description,
        location: payload.location,
        status,
        start_date: payload.start_date,
        end_date: payload.end_date,
    };
    match state.db.insert_project(&new).await {
        Ok(row) => {
            info!(id = %row.id, name = %row.name, "project created");
            state.refresh_and_broadcast().await;
            (StatusCode::CREATED, Json(serde_json::json!(row))).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}

/// DELETE /api/projects/{id} — remove a project and, by schema cascade,
/// every allocation that references it.
pub(super) async fn handler_api_projects_delete(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<Uuid>,
) -> impl IntoResponse {
    match state.db.delete_project(id).await {
        Ok(deleted) => {
            info!(id = %id, deleted, "project delete");
            state.refresh_and_broadcast().await;
            Json(serde_json::json!({"ok": true, "deleted": deleted})).into_response()
        }
        Err(e) => super::write_error_response(e),
    }
}
