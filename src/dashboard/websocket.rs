//! WebSocket handler — pushes the full snapshot on connect, on every
//! store-driven refresh, and on a periodic resync tick.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use std::sync::Arc;
use std::time::Duration;

use super::AppState;

const RESYNC_INTERVAL_SECS: u64 = 30;

pub(super) async fn handler_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.event_bus.subscribe_ws();
    ws.on_upgrade(|socket| ws_loop(socket, state, rx))
}

async fn ws_loop(
    mut socket: WebSocket,
    state: Arc<AppState>,
    rx: Option<tokio::sync::broadcast::Receiver<String>>,
) {
    state.prom_metrics.ws_clients.inc();

    // Initial state: full snapshot plus recent notifications.
    if let Some(msg) = build_update(&state) {
        if socket.send(Message::Text(msg.into())).await.is_err() {
            state.prom_metrics.ws_clients.dec();
            return;
        }
    }

    let mut interval = tokio::time::interval(Duration::from_secs(RESYNC_INTERVAL_SECS));
    interval.tick().await;

    // Without a broadcast sender installed (router built standalone, e.g.
    // in tests) the loop degrades to the periodic resync push.
    let mut rx = match rx {
        Some(rx) => rx,
        None => {
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Some(msg) = build_update(&state) {
                            if socket.send(Message::Text(msg.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    msg = socket.recv() => {
                        match msg {
                            Some(Ok(Message::Close(_))) | None => break,
                            _ => {}
                        }
                    }
                }
            }
            state.prom_metrics.ws_clients.dec();
            return;
        }
    };

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(msg) = build_update(&state) {
                    if socket.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
            }
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if socket.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(_) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    state.prom_metrics.ws_clients.dec();
}

pub(super) fn build_update(state: &Arc<AppState>) -> Option<String> {
    let snap = state.snapshot.get();
    let recent_notifications = state.event_bus.recent_notifications(20);
    serde_json::to_string(&serde_json::json!({
        "type": "update",
        "snapshot": &*snap,
        "notifications": recent_notifications,
    }))
    .ok()
}
