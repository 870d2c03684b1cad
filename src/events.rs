//! # Events — Change Activity Bus
//!
//! A bounded, thread-safe event log that collects row-change activity from
//! the store's notification stream and from this process's own writes, and
//! turns it into notifications for the frontend.
//!
//! ## Event Kinds
//!
//! | Variant | Emitted When |
//! |---------|-------------|
//! | `RowChange` | The store reports an insert/update/delete on any table |
//! | `Warning` | Non-fatal issues (e.g., listener reconnect, reload failure) |
//! | `Error` | Failures surfaced to the activity feed |
//!
//! ## Delivery
//!
//! Events are stored in a `VecDeque` (bounded to prevent unbounded growth)
//! and converted to `Notification` structs for WebSocket delivery. Row
//! changes are batched and squashed per table before notifying, so a burst
//! of writes produces one "N changes to vehicles" notification instead of
//! N. Each notification gets a monotonic `id` for deduplication.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// A row-level change operation, as reported by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    /// Parse a Postgres `TG_OP` tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(ChangeOp::Insert),
            "UPDATE" => Some(ChangeOp::Update),
            "DELETE" => Some(ChangeOp::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Insert => "INSERT",
            ChangeOp::Update => "UPDATE",
            ChangeOp::Delete => "DELETE",
        }
    }
}

/// Events fed into the bus.
#[derive(Clone, Debug)]
pub enum Event {
    RowChange { table: String, op: ChangeOp },
    Warning { context: String, message: String },
    Error { context: String, message: String },
}

/// A squashed notification ready for delivery to the frontend.
#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: String,
    pub title: String,
    pub details: Vec<String>,
    pub count: u32,
    pub timestamp_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    pub kind: String,
    pub message: String,
    pub elapsed_secs: f64,
}

#[derive(Clone, Debug)]
struct PendingChange {
    table: String,
    op: ChangeOp,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

const RECENT_EVENTS_CAP: usize = 200;
const NOTIFICATIONS_CAP: usize = 50;
const FLUSH_INTERVAL_SECS: u64 = 5;

/// Central event bus: the change listener and the write handlers emit
/// events, the bus handles buffering, squashing, and broadcasting
/// notifications via WebSocket.
pub struct EventBus {
    recent: Mutex<VecDeque<EventRecord>>,
    pending_changes: Mutex<Vec<PendingChange>>,
    last_flush: Mutex<Instant>,
    notifications: Mutex<VecDeque<Notification>>,
    next_id: AtomicU64,
    ws_sender: Mutex<Option<tokio::sync::broadcast::Sender<String>>>,
    start: Instant,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            recent: Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAP)),
            pending_changes: Mutex::new(Vec::new()),
            last_flush: Mutex::new(Instant::now()),
            notifications: Mutex::new(VecDeque::with_capacity(NOTIFICATIONS_CAP)),
            next_id: AtomicU64::new(1),
            ws_sender: Mutex::new(None),
            start: Instant::now(),
        }
    }

    /// Set the broadcast sender for WebSocket delivery.
    pub fn set_ws_sender(&self, sender: tokio::sync::broadcast::Sender<String>) {
        *lock_or_recover(&self.ws_sender) = Some(sender);
    }

    /// Subscribe to broadcasts (one receiver per WS client). Returns `None`
    /// before the sender is installed.
    pub fn subscribe_ws(&self) -> Option<tokio::sync::broadcast::Receiver<String>> {
        lock_or_recover(&self.ws_sender)
            .as_ref()
            .map(|s| s.subscribe())
    }

    /// Broadcast a raw pre-serialized message to all WS clients.
    pub fn broadcast_raw(&self, message: String) {
        if let Some(sender) = lock_or_recover(&self.ws_sender).as_ref() {
            let _ = sender.send(message);
        }
    }

    /// Emit an event. Row changes are batched; warnings and errors are
    /// recorded immediately.
    pub fn emit(&self, event: Event) {
        let elapsed = self.start.elapsed().as_secs_f64();

        match &event {
            Event::RowChange { table, op } => {
                self.push_record(
                    "change",
                    &format!("{} {}", op.as_str(), table),
                    elapsed,
                );
                lock_or_recover(&self.pending_changes).push(PendingChange {
                    table: table.clone(),
                    op: *op,
                });
            }
            Event::Warning { context, message } => {
                self.push_record("warning", &format!("[{}] {}", context, message), elapsed);
            }
            Event::Error { context, message } => {
                self.push_record("error", &format!("[{}] {}", context, message), elapsed);
                self.broadcast_notification(Notification {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    kind: "error".into(),
                    title: format!("Error: {}", context),
                    details: vec![message.clone()],
                    count: 1,
                    timestamp_ms: now_ms(),
                });
            }
        }

        // Auto-flush pending changes if enough time has passed
        let should_flush = {
            let last = lock_or_recover(&self.last_flush);
            last.elapsed().as_secs() >= FLUSH_INTERVAL_SECS
        };
        if should_flush {
            self.flush();
        }
    }

    /// Flush pending row changes: squash by table and broadcast as
    /// notifications.
    pub fn flush(&self) {
        let changes: Vec<PendingChange> = {
            let mut pending = lock_or_recover(&self.pending_changes);
            std::mem::take(&mut *pending)
        };
        *lock_or_recover(&self.last_flush) = Instant::now();

        if changes.is_empty() {
            return;
        }

        // Group by table, preserving first-seen order
        let mut tables: Vec<String> = Vec::new();
        let mut groups: std::collections::HashMap<String, Vec<PendingChange>> =
            std::collections::HashMap::new();
        for c in changes {
            if !groups.contains_key(&c.table) {
                tables.push(c.table.clone());
            }
            groups.entry(c.table.clone()).or_default().push(c);
        }

        for table in &tables {
            let items = &groups[table];
            let count = items.len() as u32;
            let title = if count == 1 {
                format!("{} changed", table)
            } else {
                format!("{} changes to {}", count, table)
            };
            let details = items
                .iter()
                .map(|c| c.op.as_str().to_string())
                .collect::<Vec<_>>();

            self.broadcast_notification(Notification {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                kind: "change".into(),
                title,
                details,
                count,
                timestamp_ms: now_ms(),
            });
        }
    }

    /// Get recent notifications for new WS connections.
    pub fn recent_notifications(&self, limit: usize) -> Vec<Notification> {
        let notifs = lock_or_recover(&self.notifications);
        notifs.iter().rev().take(limit).cloned().collect()
    }

    /// Get recent events for the API, most recent first.
    pub fn recent_events(&self, limit: usize) -> Vec<EventRecord> {
        let events = lock_or_recover(&self.recent);
        events.iter().rev().take(limit).cloned().collect()
    }

    fn push_record(&self, kind: &str, message: &str, elapsed: f64) {
        let mut recent = lock_or_recover(&self.recent);
        if recent.len() >= RECENT_EVENTS_CAP {
            recent.pop_front();
        }
        recent.push_back(EventRecord {
            kind: kind.into(),
            message: message.into(),
            elapsed_secs: elapsed,
        });
    }

    fn broadcast_notification(&self, notification: Notification) {
        {
            let mut notifs = lock_or_recover(&self.notifications);
            if notifs.len() >= NOTIFICATIONS_CAP {
                notifs.pop_front();
            }
            notifs.push_back(notification.clone());
        }
        let json = serde_json::json!({
            "type": "notification",
            "notification": notification,
        });
        self.broadcast_raw(json.to_string());
    }
}
