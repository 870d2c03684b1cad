//! Database integration tests.
//!
//! All tests require TEST_DATABASE_URL to be set.
//! Run with: TEST_DATABASE_URL=postgres://... cargo test --test db_integration
//!
//! Tests should be run single-threaded to avoid conflicts:
//!   cargo test --test db_integration -- --test-threads=1

mod common;

use opsdeck::db::{
    constraint_violation, AssetRef, AssetStatus, ConstraintKind, Database, NewEquipment,
    NewProject, NewVehicle, NewWorker, ProjectStatus, WorkerStatus,
};
use opsdeck::snapshot::Snapshot;
use uuid::Uuid;

/// Skip the test if TEST_DATABASE_URL is not set.
macro_rules! require_db {
    () => {
        if !common::has_test_db() {
            eprintln!("Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

async fn setup() -> Database {
    common::setup_test_db().await
}

fn worker(name: &str, role: &str) -> NewWorker {
    NewWorker {
        name: name.into(),
        role: role.into(),
        ..Default::default()
    }
}

fn project(name: &str) -> NewProject {
    NewProject {
        name: name.into(),
        ..Default::default()
    }
}

fn vehicle(name: &str, plate: Option<&str>) -> NewVehicle {
    NewVehicle {
        name: name.into(),
        license_plate: plate.map(Into::into),
        ..Default::default()
    }
}

fn equipment(name: &str, serial: Option<&str>) -> NewEquipment {
    NewEquipment {
        name: name.into(),
        serial_number: serial.map(Into::into),
        ..Default::default()
    }
}

// --- Registry CRUD ---

#[tokio::test]
async fn connect_to_test_db() {
    require_db!();
    let _db = setup().await;
}

#[tokio::test]
async fn insert_worker_defaults_to_active() {
    require_db!();
    let db = setup().await;

    let row = db.insert_worker(&worker("Ada Lovelace", "Engineer")).await.unwrap();
    assert_eq!(row.name, "Ada Lovelace");
    assert_eq!(row.role, "Engineer");
    assert_eq!(row.status, "active");
    assert!(row.email.is_none());
}

#[tokio::test]
async fn insert_worker_with_explicit_status() {
    require_db!();
    let db = setup().await;

    let new = NewWorker {
        status: Some(WorkerStatus::OnLeave),
        ..worker("Grace Hopper", "Admiral")
    };
    let row = db.insert_worker(&new).await.unwrap();
    assert_eq!(row.status, "on_leave");
}

#[tokio::test]
async fn insert_project_defaults_to_planning() {
    require_db!();
    let db = setup().await;

    let row = db.insert_project(&project("Bridge Retrofit")).await.unwrap();
    assert_eq!(row.status, "planning");
    assert!(row.location.is_none());
}

#[tokio::test]
async fn insert_vehicle_and_equipment_default_to_available() {
    require_db!();
    let db = setup().await;

    let v = db.insert_vehicle(&vehicle("Flatbed 1", None)).await.unwrap();
    assert_eq!(v.status, "available");

    let e = db.insert_equipment(&equipment("Compressor", None)).await.unwrap();
    assert_eq!(e.status, "available");
}

#[tokio::test]
async fn lists_are_newest_first() {
    require_db!();
    let db = setup().await;

    db.insert_worker(&worker("First", "Crew")).await.unwrap();
    db.insert_worker(&worker("Second", "Crew")).await.unwrap();

    let rows = db.get_workers().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "Second");
    assert_eq!(rows[1].name, "First");
    assert!(rows[0].created_at >= rows[1].created_at);
}

#[tokio::test]
async fn delete_missing_id_reports_zero_rows() {
    require_db!();
    let db = setup().await;

    assert_eq!(db.delete_worker(Uuid::new_v4()).await.unwrap(), 0);
    assert_eq!(db.delete_project(Uuid::new_v4()).await.unwrap(), 0);
    assert_eq!(db.delete_vehicle(Uuid::new_v4()).await.unwrap(), 0);
    assert_eq!(db.delete_equipment(Uuid::new_v4()).await.unwrap(), 0);
}

// --- Uniqueness ---

#[tokio::test]
async fn duplicate_license_plate_rejected() {
    require_db!();
    let db = setup().await;

    db.insert_vehicle(&vehicle("Truck A", Some("ABC-123"))).await.unwrap();
    let err = db
        .insert_vehicle(&vehicle("Truck B", Some("ABC-123")))
        .await
        .unwrap_err();
    assert_eq!(constraint_violation(&err), Some(ConstraintKind::Unique));
}

#[tokio::test]
async fn duplicate_email_and_serial_rejected() {
    require_db!();
    let db = setup().await;

    let with_email = NewWorker {
        email: Some("ada@example.com".into()),
        ..worker("Ada", "Engineer")
    };
    db.insert_worker(&with_email).await.unwrap();
    let err = db
        .insert_worker(&NewWorker {
            email: Some("ada@example.com".into()),
            ..worker("Imposter", "Engineer")
        })
        .await
        .unwrap_err();
    assert_eq!(constraint_violation(&err), Some(ConstraintKind::Unique));

    db.insert_equipment(&equipment("Drill", Some("SN-1"))).await.unwrap();
    let err = db
        .insert_equipment(&equipment("Drill 2", Some("SN-1")))
        .await
        .unwrap_err();
    assert_eq!(constraint_violation(&err), Some(ConstraintKind::Unique));
}

#[tokio::test]
async fn absent_unique_fields_do_not_collide() {
    require_db!();
    let db = setup().await;

    // NULL emails/plates/serials never collide with each other
    db.insert_vehicle(&vehicle("Truck A", None)).await.unwrap();
    db.insert_vehicle(&vehicle("Truck B", None)).await.unwrap();
    assert_eq!(db.get_vehicles().await.unwrap().len(), 2);
}

// --- Allocation ledger ---

#[tokio::test]
async fn allocation_requires_at_least_one_reference() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Empty Handed")).await.unwrap();
    let err: anyhow::Error = sqlx::query("INSERT INTO allocations (project_id) VALUES ($1)")
        .bind(p.id)
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
    assert_eq!(constraint_violation(&err), Some(ConstraintKind::Check));
    assert!(db.get_allocations(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn status_check_rejects_unknown_values() {
    require_db!();
    let db = setup().await;

    let err: anyhow::Error =
        sqlx::query("INSERT INTO workers (name, role, status) VALUES ('X', 'Y', 'retired')")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
    assert_eq!(constraint_violation(&err), Some(ConstraintKind::Check));
}

#[tokio::test]
async fn assign_vehicle_marks_it_in_use() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Haul Route")).await.unwrap();
    let v = db.insert_vehicle(&vehicle("Flatbed 1", None)).await.unwrap();
    assert_eq!(v.status, AssetStatus::Available.as_str());

    let row = db.assign(p.id, AssetRef::Vehicle(v.id)).await.unwrap();
    assert_eq!(row.project_id, p.id);
    assert_eq!(row.vehicle_id, Some(v.id));
    assert!(row.worker_id.is_none());
    assert!(row.equipment_id.is_none());

    let vehicles = db.get_vehicles().await.unwrap();
    assert_eq!(vehicles[0].status, "in_use");
}

#[tokio::test]
async fn assign_equipment_marks_it_in_use() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Site Prep")).await.unwrap();
    let e = db.insert_equipment(&equipment("Compressor", None)).await.unwrap();

    db.assign(p.id, AssetRef::Equipment(e.id)).await.unwrap();

    let items = db.get_equipment().await.unwrap();
    assert_eq!(items[0].status, "in_use");
}

#[tokio::test]
async fn assign_worker_has_no_status_side_effect() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Crew Work")).await.unwrap();
    let w = db.insert_worker(&worker("Ada", "Engineer")).await.unwrap();

    db.assign(p.id, AssetRef::Worker(w.id)).await.unwrap();

    let workers = db.get_workers().await.unwrap();
    assert_eq!(workers[0].status, "active");
}

#[tokio::test]
async fn assign_worker_twice_creates_two_rows() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Double Duty")).await.unwrap();
    let w = db.insert_worker(&worker("Ada", "Engineer")).await.unwrap();

    let a1 = db.assign(p.id, AssetRef::Worker(w.id)).await.unwrap();
    let a2 = db.assign(p.id, AssetRef::Worker(w.id)).await.unwrap();
    assert_ne!(a1.id, a2.id);

    let rows = db.get_allocations(Some(p.id)).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.worker_id == Some(w.id)));
}

#[tokio::test]
async fn assign_to_missing_project_is_a_foreign_key_violation() {
    require_db!();
    let db = setup().await;

    let w = db.insert_worker(&worker("Ada", "Engineer")).await.unwrap();
    let err = db.assign(Uuid::new_v4(), AssetRef::Worker(w.id)).await.unwrap_err();
    assert_eq!(constraint_violation(&err), Some(ConstraintKind::ForeignKey));
}

#[tokio::test]
async fn assign_missing_vehicle_rolls_back_entirely() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Haul Route")).await.unwrap();
    let err = db.assign(p.id, AssetRef::Vehicle(Uuid::new_v4())).await.unwrap_err();
    assert_eq!(constraint_violation(&err), Some(ConstraintKind::ForeignKey));
    assert!(db.get_allocations(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_project_cascades_to_allocations() {
    require_db!();
    let db = setup().await;

    let p1 = db.insert_project(&project("Doomed")).await.unwrap();
    let p2 = db.insert_project(&project("Survivor")).await.unwrap();
    let w = db.insert_worker(&worker("Ada", "Engineer")).await.unwrap();

    db.assign(p1.id, AssetRef::Worker(w.id)).await.unwrap();
    db.assign(p1.id, AssetRef::Worker(w.id)).await.unwrap();
    db.assign(p2.id, AssetRef::Worker(w.id)).await.unwrap();

    assert_eq!(db.delete_project(p1.id).await.unwrap(), 1);

    let remaining = db.get_allocations(None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].project_id, p2.id);
}

#[tokio::test]
async fn deleting_assets_nulls_references_but_keeps_the_row() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Ghost Town")).await.unwrap();
    let w = db.insert_worker(&worker("Ada", "Engineer")).await.unwrap();
    let v = db.insert_vehicle(&vehicle("Flatbed 1", None)).await.unwrap();
    let e = db.insert_equipment(&equipment("Compressor", None)).await.unwrap();

    let aw = db.assign(p.id, AssetRef::Worker(w.id)).await.unwrap();
    let av = db.assign(p.id, AssetRef::Vehicle(v.id)).await.unwrap();
    let ae = db.assign(p.id, AssetRef::Equipment(e.id)).await.unwrap();

    db.delete_worker(w.id).await.unwrap();
    db.delete_vehicle(v.id).await.unwrap();
    db.delete_equipment(e.id).await.unwrap();

    // Every ledger row survives with its reference cleared, even though
    // each now references nothing at all.
    let rows = db.get_allocations(Some(p.id)).await.unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert!(row.worker_id.is_none());
        assert!(row.vehicle_id.is_none());
        assert!(row.equipment_id.is_none());
        assert!([aw.id, av.id, ae.id].contains(&row.id));
    }
}

#[tokio::test]
async fn end_to_end_worker_assignment_scenario() {
    require_db!();
    let db = setup().await;

    let ada = db.insert_worker(&worker("Ada Lovelace", "Engineer")).await.unwrap();
    assert_eq!(ada.status, "active");

    let bridge = db
        .insert_project(&NewProject {
            location: Some("Riverside".into()),
            ..project("Bridge Retrofit")
        })
        .await
        .unwrap();
    assert_eq!(bridge.status, "planning");

    db.assign(bridge.id, AssetRef::Worker(ada.id)).await.unwrap();

    let rows = db.get_allocations(Some(bridge.id)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].project_id, bridge.id);
    assert_eq!(rows[0].worker_id, Some(ada.id));
    assert!(rows[0].vehicle_id.is_none());
    assert!(rows[0].equipment_id.is_none());
}

#[tokio::test]
async fn allocations_filter_by_project() {
    require_db!();
    let db = setup().await;

    let p1 = db.insert_project(&project("One")).await.unwrap();
    let p2 = db.insert_project(&project("Two")).await.unwrap();
    let w = db.insert_worker(&worker("Ada", "Engineer")).await.unwrap();

    db.assign(p1.id, AssetRef::Worker(w.id)).await.unwrap();
    db.assign(p2.id, AssetRef::Worker(w.id)).await.unwrap();

    assert_eq!(db.get_allocations(Some(p1.id)).await.unwrap().len(), 1);
    assert_eq!(db.get_allocations(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn project_status_values_accepted_by_check() {
    require_db!();
    let db = setup().await;

    for status in [
        ProjectStatus::Planning,
        ProjectStatus::InProgress,
        ProjectStatus::Completed,
        ProjectStatus::OnHold,
    ] {
        let row = db
            .insert_project(&NewProject {
                status: Some(status),
                ..project("Status Probe")
            })
            .await
            .unwrap();
        assert_eq!(row.status, status.as_str());
    }
}

#[tokio::test]
async fn updated_at_advances_on_status_side_effect() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Touch Test")).await.unwrap();
    let v = db.insert_vehicle(&vehicle("Flatbed 1", None)).await.unwrap();

    db.assign(p.id, AssetRef::Vehicle(v.id)).await.unwrap();

    let after = db.get_vehicles().await.unwrap();
    assert!(after[0].updated_at > v.updated_at);
    assert_eq!(after[0].created_at, v.created_at);
}

// --- Snapshot ---

#[tokio::test]
async fn snapshot_fetch_reads_all_five_collections() {
    require_db!();
    let db = setup().await;

    let p = db.insert_project(&project("Snapshot")).await.unwrap();
    let w = db.insert_worker(&worker("Ada", "Engineer")).await.unwrap();
    db.insert_vehicle(&vehicle("Flatbed 1", None)).await.unwrap();
    db.insert_equipment(&equipment("Compressor", None)).await.unwrap();
    db.assign(p.id, AssetRef::Worker(w.id)).await.unwrap();

    let snap = Snapshot::fetch(&db).await.unwrap();
    assert_eq!(snap.workers.len(), 1);
    assert_eq!(snap.projects.len(), 1);
    assert_eq!(snap.vehicles.len(), 1);
    assert_eq!(snap.equipment.len(), 1);
    assert_eq!(snap.allocations.len(), 1);
    assert!(snap.refreshed_at.is_some());
}
