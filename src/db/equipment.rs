//! Equipment inventory operations.

use super::{AssetStatus, Database, EquipmentRow, NewEquipment};
use anyhow::Result;
use uuid::Uuid;

impl Database {
    /// Insert an equipment item. Status falls back to the schema default
    /// (`available`) when not provided. A duplicate serial number is
    /// rejected by the unique constraint.
    pub async fn insert_equipment(&self, new: &NewEquipment) -> Result<EquipmentRow> {
        let status = new.status.unwrap_or(AssetStatus::Available);
        let row = sqlx::query_as::<_, EquipmentRow>(
            "INSERT INTO equipment (name, kind, serial_number, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, kind, serial_number, status, created_at, updated_at",
        )
        .bind(&new.name)
        .bind(&new.kind)
        .bind(&new.serial_number)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// All equipment items, newest first.
    pub async fn get_equipment(&self) -> Result<Vec<EquipmentRow>> {
        let rows = sqlx::query_as::<_, EquipmentRow>(
            "SELECT id, name, kind, serial_number, status, created_at, updated_at
             FROM equipment ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete an equipment item by id. Returns the number of rows removed;
    /// deleting an id that does not exist is not an error. Any allocation
    /// referencing the item keeps its row with `equipment_id` set to NULL
    /// by the schema.
    pub async fn delete_equipment(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
