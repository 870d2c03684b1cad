//! # Prometheus Metrics — Exposition for Container Orchestration
//!
//! Exposes opsdeck operational metrics in the Prometheus text exposition
//! format for scraping by Prometheus, Grafana Agent, or any
//! OpenMetrics-compatible collector.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `opsdeck_http_request_duration_seconds` | Histogram | `method`, `path` | API request latency |
//! | `opsdeck_change_events_total` | Counter | `table` | Store change notifications received |
//! | `opsdeck_snapshot_reloads_total` | Counter | — | Completed full snapshot refreshes |
//! | `opsdeck_ws_clients` | Gauge | — | Connected WebSocket clients |
//! | `opsdeck_db_pool_active` | Gauge | — | Checked-out pool connections |
//! | `opsdeck_db_pool_idle` | Gauge | — | Idle pool connections |
//! | `opsdeck_db_pool_max` | Gauge | — | Configured pool ceiling |
//!
//! ## Integration
//!
//! Pool gauges are updated from the dashboard's 30-second background loop;
//! the rest update inline. The `/metrics` endpoint renders the current
//! registry state on each scrape.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Label set for the request-duration histogram. `path` is normalized
/// (ids collapsed) before use to keep cardinality bounded.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

/// Label set for per-table change counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct TableLabel {
    pub table: String,
}

fn request_histogram() -> Histogram {
    // 5ms .. ~20s
    Histogram::new(exponential_buckets(0.005, 2.0, 12))
}

/// Thread-safe metrics registry for the opsdeck server.
///
/// All fields use atomic types and are safe to update from any thread or
/// async task. The `Family` type automatically creates per-label-set
/// metric instances on first use.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram, fn() -> Histogram>,
    pub change_events: Family<TableLabel, Counter>,
    pub snapshot_reloads: Counter,
    pub ws_clients: Gauge,
    pub db_pool_active: Gauge,
    pub db_pool_idle: Gauge,
    pub db_pool_max: Gauge,
}

impl Metrics {
    /// Create a new metrics registry with all opsdeck metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration: Family<HttpLabel, Histogram, fn() -> Histogram> =
            Family::new_with_constructor(request_histogram);
        registry.register(
            "opsdeck_http_request_duration_seconds",
            "API request latency by method and normalized path",
            http_request_duration.clone(),
        );

        let change_events = Family::<TableLabel, Counter>::default();
        registry.register(
            "opsdeck_change_events",
            "Store change notifications received by table",
            change_events.clone(),
        );

        let snapshot_reloads = Counter::default();
        registry.register(
            "opsdeck_snapshot_reloads",
            "Completed full snapshot refreshes",
            snapshot_reloads.clone(),
        );

        let ws_clients = Gauge::default();
        registry.register(
            "opsdeck_ws_clients",
            "Connected WebSocket clients",
            ws_clients.clone(),
        );

        let db_pool_active = Gauge::default();
        registry.register(
            "opsdeck_db_pool_active",
            "Checked-out database pool connections",
            db_pool_active.clone(),
        );

        let db_pool_idle = Gauge::default();
        registry.register(
            "opsdeck_db_pool_idle",
            "Idle database pool connections",
            db_pool_idle.clone(),
        );

        let db_pool_max = Gauge::default();
        registry.register(
            "opsdeck_db_pool_max",
            "Configured database pool ceiling",
            db_pool_max.clone(),
        );

        Self {
            registry,
            http_request_duration,
            change_events,
            snapshot_reloads,
            ws_clients,
            db_pool_active,
            db_pool_idle,
            db_pool_max,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("encoding metrics should not fail");
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
