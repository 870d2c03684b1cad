//! Allocation ledger — transactional assignment of assets to projects.
//!
//! An allocation links a project to exactly one worker, vehicle, or
//! equipment item. The single-variant [`AssetRef`] makes it impossible to
//! populate two reference columns in one call; the schema's insert trigger
//! backs the same rule up against writes from other clients.
//!
//! Assigning a vehicle or equipment item also flips that asset's status to
//! `in_use`. Both statements run in one transaction, so the ledger can
//! never show an allocation whose asset is still marked `available`.
//! There is no unassign operation and nothing ever flips a status back to
//! `available`.

use super::{AllocationRow, AssetStatus, Database};
use anyhow::Result;
use uuid::Uuid;

/// The one asset a ledger entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRef {
    Worker(Uuid),
    Vehicle(Uuid),
    Equipment(Uuid),
}

impl AssetRef {
    /// The wire/CLI tag for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            AssetRef::Worker(_) => "worker",
            AssetRef::Vehicle(_) => "vehicle",
            AssetRef::Equipment(_) => "equipment",
        }
    }

    /// The referenced row id.
    pub fn id(&self) -> Uuid {
        match self {
            AssetRef::Worker(id) | AssetRef::Vehicle(id) | AssetRef::Equipment(id) => *id,
        }
    }

    /// Build a reference from a wire/CLI tag.
    pub fn from_kind(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "worker" => Some(AssetRef::Worker(id)),
            "vehicle" => Some(AssetRef::Vehicle(id)),
            "equipment" => Some(AssetRef::Equipment(id)),
            _ => None,
        }
    }
}

impl Database {
    /// Assign an asset to a project. Inserts the ledger row and, for
    /// vehicles and equipment, marks the asset `in_use` — atomically.
    ///
    /// Existence of the project and the asset is not pre-checked; a
    /// dangling id rolls the transaction back with a foreign-key violation.
    /// Repeat assignment is allowed and produces a distinct row each time.
    pub async fn assign(&self, project_id: Uuid, asset: AssetRef) -> Result<AllocationRow> {
        let mut tx = self.pool.begin().await?;

        let column = match asset {
            AssetRef::Worker(_) => "worker_id",
            AssetRef::Vehicle(_) => "vehicle_id",
            AssetRef::Equipment(_) => "equipment_id",
        };
        let row = sqlx::query_as::<_, AllocationRow>(&format!(
            "INSERT INTO allocations (project_id, {column})
             VALUES ($1, $2)
             RETURNING id, project_id, worker_id, vehicle_id, equipment_id, assigned_at",
        ))
        .bind(project_id)
        .bind(asset.id())
        .fetch_one(&mut *tx)
        .await?;

        match asset {
            AssetRef::Worker(_) => {}
            AssetRef::Vehicle(id) => {
                sqlx::query("UPDATE vehicles SET status = $1 WHERE id = $2")
                    .bind(AssetStatus::InUse.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            AssetRef::Equipment(id) => {
                sqlx::query("UPDATE equipment SET status = $1 WHERE id = $2")
                    .bind(AssetStatus::InUse.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(row)
    }

    /// Ledger entries, newest first, optionally filtered by project.
    /// Returns raw reference ids — no hydration of the related records.
    pub async fn get_allocations(&self, project_id: Option<Uuid>) -> Result<Vec<AllocationRow>> {
        let rows = if let Some(pid) = project_id {
            sqlx::query_as::<_, AllocationRow>(
                "SELECT id, project_id, worker_id, vehicle_id, equipment_id, assigned_at
                 FROM allocations WHERE project_id = $1 ORDER BY assigned_at DESC",
            )
            .bind(pid)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, AllocationRow>(
                "SELECT id, project_id, worker_id, vehicle_id, equipment_id, assigned_at
                 FROM allocations ORDER BY assigned_at DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }
}
