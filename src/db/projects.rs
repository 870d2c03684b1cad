//! Project operations.
//!
//! Projects are the anchor of the allocation ledger: deleting one cascades
//! to every allocation that references it (schema `ON DELETE CASCADE`).

use super::{Database, NewProject, ProjectRow, ProjectStatus};
use anyhow::Result;
use uuid::Uuid;

impl Database {
    /// Insert a project. Status falls back to the schema default
    /// (`planning`) when not provided.
    pub async fn insert_project(&self, new: &NewProject) -> Result<ProjectRow> {
        let status = new.status.unwrap_or(ProjectStatus::Planning);
        let row = sqlx::query_as::<_, ProjectRow>(
            "INSERT INTO projects (name, description, location, status, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, name, description, location, status, start_date, end_date,
                       created_at, updated_at",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.location)
        .bind(status.as_str())
        .bind(new.start_date)
        .bind(new.end_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// All projects, newest first.
    pub async fn get_projects(&self) -> Result<Vec<ProjectRow>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, name, description, location, status, start_date, end_date,
                    created_at, updated_at
             FROM projects ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete a project by id. Returns the number of rows removed; deleting
    /// an id that does not exist is not an error. Allocations referencing
    /// the project are removed by the cascade.
    pub async fn delete_project(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
