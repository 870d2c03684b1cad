//! # Change Listener — Store-Wide Notification Subscription
//!
//! Holds one `LISTEN` subscription covering the whole schema. Row-level
//! triggers (see `supabase/migrations/002_change_notifications.sql`) call
//! `pg_notify` on every insert/update/delete, so changes made by *any*
//! client of the store land here, not just this process's own writes.
//!
//! Every delivered event, regardless of table, requests a full snapshot
//! reload — there is no incremental patching. A lost connection is never
//! fatal: it is logged, surfaced on the event bus, and the listener
//! reconnects after a delay, resyncing once on reconnect to cover anything
//! missed while down.

use crate::dashboard::AppState;
use crate::events::{ChangeOp, Event};
use crate::prom_metrics::TableLabel;
use anyhow::Result;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The notification channel all five table triggers publish to.
pub const CHANNEL: &str = "opsdeck_changes";

const RECONNECT_DELAY_SECS: u64 = 5;

#[derive(Deserialize)]
struct ChangePayload {
    table: String,
    op: String,
}

/// Parse a trigger payload of the form `{"table": "...", "op": "INSERT"}`.
pub fn parse_payload(raw: &str) -> Option<(String, ChangeOp)> {
    let payload: ChangePayload = serde_json::from_str(raw).ok()?;
    let op = ChangeOp::parse(&payload.op)?;
    Some((payload.table, op))
}

/// Run the subscription until the process exits, reconnecting on failure.
pub async fn run(state: Arc<AppState>) {
    loop {
        if let Err(e) = listen_once(&state).await {
            warn!(error = %e, "change listener disconnected, will reconnect");
            state.event_bus.emit(Event::Warning {
                context: "listener".into(),
                message: e.to_string(),
            });
        }
        tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
    }
}

async fn listen_once(state: &Arc<AppState>) -> Result<()> {
    let mut listener = PgListener::connect_with(state.db.pool()).await?;
    listener.listen(CHANNEL).await?;
    info!(channel = CHANNEL, "change listener connected");

    // Resync: cover anything that changed while the subscription was down.
    state.refresh_and_broadcast().await;

    loop {
        let notification = listener.recv().await?;
        match parse_payload(notification.payload()) {
            Some((table, op)) => {
                state
                    .prom_metrics
                    .change_events
                    .get_or_create(&TableLabel {
                        table: table.clone(),
                    })
                    .inc();
                state.event_bus.emit(Event::RowChange { table, op });
            }
            None => {
                warn!(payload = notification.payload(), "unparseable change payload");
            }
        }
        state.refresh_and_broadcast().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_payload_accepts_trigger_json() {
        let (table, op) = parse_payload(r#"{"table":"vehicles","op":"UPDATE"}"#).unwrap();
        assert_eq!(table, "vehicles");
        assert_eq!(op, ChangeOp::Update);
    }

    #[test]
    fn parse_payload_rejects_malformed_input() {
        assert!(parse_payload("").is_none());
        assert!(parse_payload("not json").is_none());
        assert!(parse_payload(r#"{"table":"workers"}"#).is_none());
        assert!(parse_payload(r#"{"table":"workers","op":"TRUNCATE"}"#).is_none());
        assert!(parse_payload(r#"{"op":"INSERT"}"#).is_none());
    }
}
