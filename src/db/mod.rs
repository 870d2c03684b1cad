//! # Database — PostgreSQL Storage Layer
//!
//! Provides async database operations for the asset registry and the
//! allocation ledger via `sqlx::PgPool` connecting to Supabase PostgreSQL.
//!
//! ## Schema
//!
//! - `workers`: roster of people with a role and an activity status
//! - `projects`: jobs with a location, date range, and lifecycle status
//! - `vehicles`: fleet vehicles with a maintenance-relevant status
//! - `equipment`: tools and machinery with a maintenance-relevant status
//! - `allocations`: join rows linking a project to a worker, vehicle, or
//!   equipment item
//!
//! ## Module Structure
//!
//! Operations are split into submodules by table:
//!
//! - [`workers`] — worker insert, list, delete
//! - [`projects`] — project insert, list, delete
//! - [`vehicles`] — vehicle insert, list, delete, status update
//! - [`equipment`] — equipment insert, list, delete, status update
//! - [`allocations`] — transactional assignment and ledger queries
//!
//! ## Consistency rules
//!
//! Referential integrity, uniqueness, and the at-least-one-reference rule on
//! allocations all live in the schema (`supabase/migrations/`). The Rust
//! layer never pre-checks existence before a write; a dangling id surfaces
//! as a foreign-key violation from Postgres, which [`constraint_violation`]
//! classifies for the API layer.

mod allocations;
mod equipment;
mod projects;
mod vehicles;
mod workers;

pub use allocations::AssetRef;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use uuid::Uuid;

// ── Status enumerations ─────────────────────────────────────────

/// Worker activity status. Stored as text; the schema CHECK constraint
/// rejects anything outside this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Active,
    Inactive,
    OnLeave,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Active => "active",
            WorkerStatus::Inactive => "inactive",
            WorkerStatus::OnLeave => "on_leave",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(WorkerStatus::Active),
            "inactive" => Some(WorkerStatus::Inactive),
            "on_leave" => Some(WorkerStatus::OnLeave),
            _ => None,
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(ProjectStatus::Planning),
            "in_progress" => Some(ProjectStatus::InProgress),
            "completed" => Some(ProjectStatus::Completed),
            "on_hold" => Some(ProjectStatus::OnHold),
            _ => None,
        }
    }
}

/// Maintenance-relevant status shared by vehicles and equipment.
/// Workers deliberately have no such lifecycle — allocating a worker
/// performs no status side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Available,
    InUse,
    Maintenance,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Available => "available",
            AssetStatus::InUse => "in_use",
            AssetStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(AssetStatus::Available),
            "in_use" => Some(AssetStatus::InUse),
            "maintenance" => Some(AssetStatus::Maintenance),
            _ => None,
        }
    }
}

// ── Registry row types ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkerRow {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VehicleRow {
    pub id: Uuid,
    pub name: String,
    pub kind: Option<String>,
    pub license_plate: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EquipmentRow {
    pub id: Uuid,
    pub name: String,
    pub kind: Option<String>,
    pub serial_number: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// ── Ledger row type ─────────────────────────────────────────────

/// One ledger entry. Exactly one of the three reference columns is set at
/// insert time; set-null cascades may clear them later without deleting
/// the row. No join/hydration — callers cross-reference ids against the
/// registry snapshot.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AllocationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub worker_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub equipment_id: Option<Uuid>,
    pub assigned_at: chrono::DateTime<chrono::Utc>,
}

// ── Insert payloads ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWorker {
    pub name: String,
    pub role: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<WorkerStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVehicle {
    pub name: String,
    pub kind: Option<String>,
    pub license_plate: Option<String>,
    pub status: Option<AssetStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEquipment {
    pub name: String,
    pub kind: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<AssetStatus>,
}

// ── Constraint classification ───────────────────────────────────

/// Which schema rule a failed write tripped over. The API layer maps these
/// to specific HTTP statuses instead of a generic 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// A required column was NULL (SQLSTATE 23502).
    NotNull,
    /// A referenced row does not exist (SQLSTATE 23503).
    ForeignKey,
    /// A unique column collided (SQLSTATE 23505): worker email, vehicle
    /// license plate, or equipment serial number.
    Unique,
    /// A check-class rule failed (SQLSTATE 23514), which here means an
    /// allocation with no worker, vehicle, or equipment reference.
    Check,
}

/// Classify an error from a write operation as a constraint violation,
/// if that is what it is. Returns `None` for connectivity and other
/// non-constraint failures.
pub fn constraint_violation(err: &anyhow::Error) -> Option<ConstraintKind> {
    let sqlx_err = err.downcast_ref::<sqlx::Error>()?;
    let db_err = match sqlx_err {
        sqlx::Error::Database(e) => e,
        _ => return None,
    };
    match db_err.code().as_deref() {
        Some("23502") => Some(ConstraintKind::NotNull),
        Some("23503") => Some(ConstraintKind::ForeignKey),
        Some("23505") => Some(ConstraintKind::Unique),
        Some("23514") => Some(ConstraintKind::Check),
        _ => None,
    }
}

// ── Database struct and connection ──────────────────────────────

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Connection pool size. Small on purpose: the Supabase session pooler
/// caps per-client connections, and the change listener holds one more.
pub const POOL_MAX_CONNECTIONS: u32 = 5;

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Manually parses the URL to preserve the full username — sqlx's
    /// built-in parser strips the ".project-ref" suffix that the Supabase
    /// pooler requires.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username)
            .statement_cache_capacity(0);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    ///
    /// Used by the `/readyz` readiness probe. Returns `Ok(())` if the
    /// database responds, or an error if the connection is broken.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────
