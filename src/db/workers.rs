//! Worker roster operations.
//!
//! Workers have no maintenance lifecycle: allocating one to a project
//! performs no status side effect, and the same worker can appear in any
//! number of allocations at once.

use super::{Database, NewWorker, WorkerRow, WorkerStatus};
use anyhow::Result;
use uuid::Uuid;

impl Database {
    /// Insert a worker. Status falls back to the schema default (`active`)
    /// when not provided.
    pub async fn insert_worker(&self, new: &NewWorker) -> Result<WorkerRow> {
        let status = new.status.unwrap_or(WorkerStatus::Active);
        let row = sqlx::query_as::<_, WorkerRow>(
            "INSERT INTO workers (name, role, email, phone, status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, role, email, phone, status, created_at, updated_at",
        )
        .bind(&new.name)
        .bind(&new.role)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// All workers, newest first.
    pub async fn get_workers(&self) -> Result<Vec<WorkerRow>> {
        let rows = sqlx::query_as::<_, WorkerRow>(
            "SELECT id, name, role, email, phone, status, created_at, updated_at
             FROM workers ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete a worker by id. Returns the number of rows removed; deleting
    /// an id that does not exist is not an error. Any allocation referencing
    /// the worker keeps its row with `worker_id` set to NULL by the schema.
    pub async fn delete_worker(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM workers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
