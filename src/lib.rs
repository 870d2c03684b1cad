//! # opsdeck — Operations Dashboard Backend
//!
//! An asset registry (workers, projects, vehicles, equipment) and an
//! allocation ledger over Supabase PostgreSQL, served through an Axum
//! HTTP/WebSocket API. The store owns all consistency rules; this crate is
//! the typed surface over them plus the realtime snapshot machinery.

pub mod dashboard;
pub mod db;
pub mod events;
pub mod listener;
pub mod prom_metrics;
pub mod snapshot;
