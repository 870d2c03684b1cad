//! # Dashboard — Web Server and API Surface
//!
//! Runs an Axum HTTP server that serves the dashboard frontend (static
//! export), provides REST endpoints for the asset registry and the
//! allocation ledger, and pushes snapshot updates over WebSocket whenever
//! the store reports a change.

mod routes_allocations;
mod routes_equipment;
mod routes_health;
mod routes_notifications;
mod routes_projects;
mod routes_status;
mod routes_vehicles;
mod routes_workers;
mod websocket;

use crate::{db, events, listener, prom_metrics, snapshot};
use anyhow::Result;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};

pub struct AppState {
    pub db: db::Database,
    pub snapshot: snapshot::SnapshotCache,
    pub event_bus: events::EventBus,
    pub prom_metrics: prom_metrics::Metrics,
}

impl AppState {
    pub fn with_db(db: db::Database) -> Arc<Self> {
        Arc::new(AppState {
            db,
            snapshot: snapshot::SnapshotCache::new(),
            event_bus: events::EventBus::new(),
            prom_metrics: prom_metrics::Metrics::new(),
        })
    }

    /// Reload the snapshot and, if it changed hands, push the fresh state
    /// to every WebSocket client. Reload failures degrade to a logged
    /// warning — the dashboard keeps serving the last good snapshot.
    pub async fn refresh_and_broadcast(&self) {
        match self.snapshot.reload(&self.db).await {
            Ok(snap) => {
                self.prom_metrics.snapshot_reloads.inc();
                let msg = serde_json::json!({
                    "type": "update",
                    "snapshot": &*snap,
                });
                self.event_bus.broadcast_raw(msg.to_string());
            }
            Err(e) => {
                warn!(error = %e, "snapshot reload failed");
                self.event_bus.emit(events::Event::Warning {
                    context: "snapshot".into(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Map a failed write to a response. Constraint violations get a specific
/// status and carry the database's message, which names the offending
/// constraint; everything else is a 500.
pub(super) fn write_error_response(e: anyhow::Error) -> Response {
    use db::ConstraintKind;
    let status = match db::constraint_violation(&e) {
        Some(ConstraintKind::Unique) => StatusCode::CONFLICT,
        Some(ConstraintKind::ForeignKey) | Some(ConstraintKind::Check) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Some(ConstraintKind::NotNull) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
}

/// Middleware that records HTTP request duration into the Prometheus
/// histogram, generates (or propagates) a request ID for correlation, and
/// wraps the request in a tracing span using `.instrument()` for proper
/// async propagation.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let response = next.run(req).instrument(span).await;

    let duration = start.elapsed().as_secs_f64();
    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(duration);

    let mut response = response;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Normalize URL path to collapse high-cardinality segments (UUIDs, numeric
/// IDs) into placeholders, preventing histogram label explosion.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if seg.is_empty() {
                seg.to_string()
            } else if seg.chars().all(|c| c.is_ascii_digit()) {
                ":id".to_string()
            } else if seg.len() == 36 && seg.chars().filter(|c| *c == '-').count() == 4 {
                ":uuid".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(websocket::handler_ws))
        .route("/api/snapshot", get(routes_status::handler_api_snapshot))
        .route(
            "/api/snapshot/refresh",
            axum::routing::post(routes_status::handler_api_snapshot_refresh),
        )
        .route(
            "/api/workers",
            get(routes_workers::handler_api_workers_list)
                .post(routes_workers::handler_api_workers_create),
        )
        .route(
            "/api/workers/{id}",
            axum::routing::delete(routes_workers::handler_api_workers_delete),
        )
        .route(
            "/api/projects",
            get(routes_projects::handler_api_projects_list)
                .post(routes_projects::handler_api_projects_create),
        )
        .route(
            "/api/projects/{id}",
            axum::routing::delete(routes_projects::handler_api_projects_delete),
        )
        .route(
            "/api/vehicles",
            get(routes_vehicles::handler_api_vehicles_list)
                .post(routes_vehicles::handler_api_vehicles_create),
        )
        .route(
            "/api/vehicles/{id}",
            axum::routing::delete(routes_vehicles::handler_api_vehicles_delete),
        )
        .route(
            "/api/equipment",
            get(routes_equipment::handler_api_equipment_list)
                .post(routes_equipment::handler_api_equipment_create),
        )
        .route(
            "/api/equipment/{id}",
            axum::routing::delete(routes_equipment::handler_api_equipment_delete),
        )
        .route(
            "/api/allocations",
            get(routes_allocations::handler_api_allocations_list)
                .post(routes_allocations::handler_api_allocations_create),
        )
        .route(
            "/api/notifications",
            get(routes_notifications::handler_api_notifications),
        )
        .route("/api/events", get(routes_notifications::handler_api_events))
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    } else {
        app = app.route("/", get(routes_status::handler_index));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(CatchPanicLayer::new())
    .layer(axum::middleware::from_fn_with_state(
        state.clone(),
        metrics_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(1024 * 1024))
    .layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(30),
    ))
    .with_state(state)
}

pub async fn run(port: u16, database_url: &str, static_dir: Option<&Path>) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    let (ws_tx, _) = tokio::sync::broadcast::channel::<String>(256);
    let state = AppState::with_db(database);
    state.event_bus.set_ws_sender(ws_tx.clone());
    state
        .prom_metrics
        .db_pool_max
        .set(db::POOL_MAX_CONNECTIONS as i64);
    let app = build_router(state.clone(), static_dir);

    // First load before accepting traffic; a failure is non-fatal and the
    // listener's resync-on-connect will retry.
    state.refresh_and_broadcast().await;

    // Background task: store-wide change subscription
    let listener_state = Arc::clone(&state);
    tokio::spawn(async move {
        listener::run(listener_state).await;
    });

    // Background task: flush squashed notifications, sample pool gauges,
    // and periodically resync the snapshot in case a notification was
    // dropped between reconnects
    let tick_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        let mut ticks: u64 = 0;
        loop {
            interval.tick().await;
            ticks += 1;
            tick_state.event_bus.flush();

            let pool_size = tick_state.db.pool().size();
            let pool_idle = tick_state.db.pool().num_idle();
            tick_state
                .prom_metrics
                .db_pool_active
                .set((pool_size as i64) - (pool_idle as i64));
            tick_state.prom_metrics.db_pool_idle.set(pool_idle as i64);

            if ticks % 10 == 0 {
                tick_state.refresh_and_broadcast().await;
            }
        }
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "dashboard running");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("dashboard shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! { _ = ctrl_c => info!("received SIGINT, shutting down"), _ = sigterm.recv() => info!("received SIGTERM, shutting down") }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_preserves_api_routes() {
        assert_eq!(normalize_path("/api/snapshot"), "/api/snapshot");
        assert_eq!(normalize_path("/api/workers"), "/api/workers");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn normalize_path_collapses_uuids() {
        assert_eq!(
            normalize_path("/api/workers/550e8400-e29b-41d4-a716-446655440000"),
            "/api/workers/:uuid"
        );
        assert_eq!(
            normalize_path("/api/vehicles/6f1f8f4e-5b7a-4f5e-9d3c-2a1b0c9d8e7f"),
            "/api/vehicles/:uuid"
        );
    }

    #[test]
    fn normalize_path_collapses_numeric_ids() {
        assert_eq!(normalize_path("/api/things/42"), "/api/things/:id");
    }

    #[test]
    fn normalize_path_handles_empty_and_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");
    }
}
