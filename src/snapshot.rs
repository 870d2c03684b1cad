//! # Snapshot — Wholesale Application State Refresh
//!
//! The dashboard never patches its view of the data incrementally: any
//! write, from this process or any other client of the store, triggers a
//! full re-read of all five collections. [`Snapshot`] is that re-read as a
//! value; [`SnapshotCache`] owns the current one and serializes reloads.
//!
//! ## Coalescing
//!
//! Change events can arrive in bursts (one per statement, from every
//! client). Reloads are guarded by a tokio mutex plus a dirty flag: the
//! task holding the guard keeps refetching while the flag is set, and a
//! caller that finds the guard taken just marks the flag and returns. The
//! effect is last-fetch-wins with at most one fetch in flight — a stale
//! in-flight fetch can never overwrite a newer completed one, because
//! there is never more than one in flight.

use crate::db::{AllocationRow, Database, EquipmentRow, ProjectRow, VehicleRow, WorkerRow};
use anyhow::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// All five collections as of one completed fetch, newest rows first.
#[derive(Clone, Default, Serialize)]
pub struct Snapshot {
    pub workers: Vec<WorkerRow>,
    pub projects: Vec<ProjectRow>,
    pub vehicles: Vec<VehicleRow>,
    pub equipment: Vec<EquipmentRow>,
    pub allocations: Vec<AllocationRow>,
    pub refreshed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Snapshot {
    /// Re-read every collection. Requests run sequentially — each fetch
    /// awaits one store round trip at a time.
    pub async fn fetch(db: &Database) -> Result<Self> {
        let workers = db.get_workers().await?;
        let projects = db.get_projects().await?;
        let vehicles = db.get_vehicles().await?;
        let equipment = db.get_equipment().await?;
        let allocations = db.get_allocations(None).await?;
        Ok(Snapshot {
            workers,
            projects,
            vehicles,
            equipment,
            allocations,
            refreshed_at: Some(chrono::Utc::now()),
        })
    }
}

/// Owns the current [`Snapshot`] and the reload guard.
pub struct SnapshotCache {
    current: RwLock<Arc<Snapshot>>,
    reloading: tokio::sync::Mutex<()>,
    dirty: AtomicBool,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    pub fn new() -> Self {
        SnapshotCache {
            current: RwLock::new(Arc::new(Snapshot::default())),
            reloading: tokio::sync::Mutex::new(()),
            dirty: AtomicBool::new(false),
        }
    }

    /// The most recently completed snapshot. Cheap — clones an `Arc`.
    pub fn get(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Request a reload from the database.
    pub async fn reload(&self, db: &Database) -> Result<Arc<Snapshot>> {
        self.reload_with(|| Snapshot::fetch(db)).await
    }

    /// Request a reload using the given fetch operation. If no reload is
    /// running, fetches until the dirty flag stays clear and returns the
    /// fresh snapshot. If one is already running, marks the cache dirty so
    /// the running reload goes around again, and returns the current
    /// snapshot without waiting.
    pub async fn reload_with<F, Fut>(&self, fetch: F) -> Result<Arc<Snapshot>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        self.dirty.store(true, Ordering::SeqCst);
        let _guard = match self.reloading.try_lock() {
            Ok(g) => g,
            Err(_) => return Ok(self.get()),
        };
        while self.dirty.swap(false, Ordering::SeqCst) {
            match fetch().await {
                Ok(snap) => {
                    *self
                        .current
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = Arc::new(snap);
                }
                Err(e) => {
                    // Leave the flag set so the next change event retries.
                    self.dirty.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }
        Ok(self.get())
    }

    /// Whether a reload request is pending or in flight.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
}
