//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the dashboard server and the roster/ledger
//! management functions. Handles shared concerns: `.env` loading,
//! structured logging setup, and database URL resolution.
//!
//! ## Subcommands
//!
//! `serve` starts the web dashboard and realtime API. The roster commands
//! (`worker`, `project`, `vehicle`, `equipment`) manage the four registry
//! collections from the terminal; `assign` and `allocations` drive the
//! allocation ledger.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection for all
//!   persistence. Required — there is no silent fallback. `serve
//!   --local-dev` opts into the well-known local Supabase development
//!   endpoint and announces it loudly.
//! - `LOG_FORMAT=json` switches logging to JSON for log collectors.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "opsdeck",
    about = "Operations dashboard: workers, projects, vehicles, equipment"
)]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the web dashboard and realtime API
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 7410)]
        port: u16,
        /// Directory to serve static files from (e.g. a frontend export)
        #[arg(long)]
        static_dir: Option<PathBuf>,
        /// Fall back to the local Supabase development database when no
        /// DATABASE_URL is set (never silent: logged at startup)
        #[arg(long)]
        local_dev: bool,
    },
    /// Manage the worker roster
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Manage the vehicle fleet
    Vehicle {
        #[command(subcommand)]
        action: VehicleAction,
    },
    /// Manage the equipment inventory
    Equipment {
        #[command(subcommand)]
        action: EquipmentAction,
    },
    /// Assign a worker, vehicle, or equipment item to a project
    Assign {
        /// Project id
        #[arg(long)]
        project: Uuid,
        /// Worker id to assign
        #[arg(long)]
        worker: Option<Uuid>,
        /// Vehicle id to assign (marks the vehicle in_use)
        #[arg(long)]
        vehicle: Option<Uuid>,
        /// Equipment id to assign (marks the item in_use)
        #[arg(long)]
        equipment: Option<Uuid>,
    },
    /// List allocation ledger entries
    Allocations {
        /// Filter by project id
        #[arg(long)]
        project: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum WorkerAction {
    /// Add a worker to the roster
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// active, inactive, or on_leave (default active)
        #[arg(long)]
        status: Option<String>,
    },
    /// List all workers
    List,
    /// Delete a worker by id
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// planning, in_progress, completed, or on_hold (default planning)
        #[arg(long)]
        status: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<chrono::NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<chrono::NaiveDate>,
    },
    /// List all projects
    List,
    /// Delete a project by id (removes its allocations)
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum VehicleAction {
    /// Add a vehicle to the fleet
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        license_plate: Option<String>,
        /// available, in_use, or maintenance (default available)
        #[arg(long)]
        status: Option<String>,
    },
    /// List all vehicles
    List,
    /// Delete a vehicle by id
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum EquipmentAction {
    /// Add an equipment item to the inventory
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        serial_number: Option<String>,
        /// available, in_use, or maintenance (default available)
        #[arg(long)]
        status: Option<String>,
    },
    /// List all equipment
    List,
    /// Delete an equipment item by id
    Delete { id: Uuid },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for K8s, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            port,
            static_dir,
            local_dev,
        } => {
            let database_url = cli::resolve_database_url(&cli, *local_dev)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(opsdeck::dashboard::run(
                *port,
                &database_url,
                static_dir.as_deref(),
            ))
        }
        Commands::Worker { action } => cli::run_worker(&cli, action),
        Commands::Project { action } => cli::run_project(&cli, action),
        Commands::Vehicle { action } => cli::run_vehicle(&cli, action),
        Commands::Equipment { action } => cli::run_equipment(&cli, action),
        Commands::Assign {
            project,
            worker,
            vehicle,
            equipment,
        } => cli::run_assign(&cli, *project, *worker, *vehicle, *equipment),
        Commands::Allocations { project } => cli::run_allocations(&cli, *project),
    }
}
