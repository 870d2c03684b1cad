//! Vehicle fleet operations.

use super::{AssetStatus, Database, NewVehicle, VehicleRow};
use anyhow::Result;
use uuid::Uuid;

impl Database {
    /// Insert a vehicle. Status falls back to the schema default
    /// (`available`) when not provided. A duplicate license plate is
    /// rejected by the unique constraint.
    pub async fn insert_vehicle(&self, new: &NewVehicle) -> Result<VehicleRow> {
        let status = new.status.unwrap_or(AssetStatus::Available);
        let row = sqlx::query_as::<_, VehicleRow>(
            "INSERT INTO vehicles (name, kind, license_plate, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, kind, license_plate, status, created_at, updated_at",
        )
        .bind(&new.name)
        .bind(&new.kind)
        .bind(&new.license_plate)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// All vehicles, newest first.
    pub async fn get_vehicles(&self) -> Result<Vec<VehicleRow>> {
        let rows = sqlx::query_as::<_, VehicleRow>(
            "SELECT id, name, kind, license_plate, status, created_at, updated_at
             FROM vehicles ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete a vehicle by id. Returns the number of rows removed; deleting
    /// an id that does not exist is not an error. Any allocation referencing
    /// the vehicle keeps its row with `vehicle_id` set to NULL by the schema.
    pub async fn delete_vehicle(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
