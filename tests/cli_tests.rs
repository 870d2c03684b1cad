//! CLI integration tests using assert_cmd.
//!
//! Tests without database: always run (help, arg validation).
//! Tests with database: gated on TEST_DATABASE_URL environment variable.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn opsdeck() -> Command {
    let mut cmd = Command::cargo_bin("opsdeck").unwrap();
    cmd.env_remove("DATABASE_URL");
    cmd
}

// --- Help and arg validation (no database needed) ---

#[test]
fn help_shows_all_subcommands() {
    opsdeck().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("worker"))
            .and(predicate::str::contains("project"))
            .and(predicate::str::contains("vehicle"))
            .and(predicate::str::contains("equipment"))
            .and(predicate::str::contains("assign"))
            .and(predicate::str::contains("allocations")),
    );
}

#[test]
fn help_worker_add_shows_args() {
    opsdeck()
        .args(["worker", "add", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--name")
                .and(predicate::str::contains("--role"))
                .and(predicate::str::contains("--email"))
                .and(predicate::str::contains("--status")),
        );
}

#[test]
fn help_assign_shows_asset_flags() {
    opsdeck()
        .args(["assign", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--project")
                .and(predicate::str::contains("--worker"))
                .and(predicate::str::contains("--vehicle"))
                .and(predicate::str::contains("--equipment")),
        );
}

#[test]
fn worker_list_without_database_url_errors() {
    opsdeck()
        .args(["worker", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL is required"));
}

#[test]
fn serve_without_database_url_errors() {
    opsdeck()
        .args(["serve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL is required"));
}

#[test]
fn assign_requires_exactly_one_asset_flag() {
    opsdeck()
        .args([
            "assign",
            "--project",
            "550e8400-e29b-41d4-a716-446655440000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly one of"));
}

#[test]
fn assign_rejects_two_asset_flags() {
    opsdeck()
        .args([
            "assign",
            "--project",
            "550e8400-e29b-41d4-a716-446655440000",
            "--worker",
            "550e8400-e29b-41d4-a716-446655440001",
            "--vehicle",
            "550e8400-e29b-41d4-a716-446655440002",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly one of"));
}

#[test]
fn worker_delete_rejects_malformed_uuid() {
    opsdeck()
        .args(["worker", "delete", "not-a-uuid"])
        .assert()
        .failure();
}

// --- Roster round trip (database required) ---

#[test]
fn worker_add_list_delete_round_trip() {
    if !common::has_test_db() {
        eprintln!("Skipping: TEST_DATABASE_URL not set");
        return;
    }
    let url = common::test_db_url();
    {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(common::setup_test_db());
    }

    opsdeck()
        .env("DATABASE_URL", &url)
        .args([
            "worker", "add", "--name", "Ada Lovelace", "--role", "Engineer",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace").and(predicate::str::contains("active")));

    let list = opsdeck()
        .env("DATABASE_URL", &url)
        .args(["worker", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Lovelace"));
    let stdout = String::from_utf8_lossy(&list.get_output().stdout).to_string();
    let id = stdout
        .lines()
        .find(|l| l.contains("Ada Lovelace"))
        .and_then(|l| l.split_whitespace().next())
        .expect("worker row with id")
        .to_string();

    opsdeck()
        .env("DATABASE_URL", &url)
        .args(["worker", "delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1"));
}

#[test]
fn deleting_absent_vehicle_reports_zero() {
    if !common::has_test_db() {
        eprintln!("Skipping: TEST_DATABASE_URL not set");
        return;
    }
    let url = common::test_db_url();
    {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(common::setup_test_db());
    }

    opsdeck()
        .env("DATABASE_URL", &url)
        .args([
            "vehicle",
            "delete",
            "550e8400-e29b-41d4-a716-446655440000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 0"));
}
