//! Shared test helpers for integration tests.

#![allow(dead_code)]

use tokio::sync::OnceCell;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment
/// variable. Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// One-time schema initialization per test process.
static SCHEMA_INIT: OnceCell<()> = OnceCell::const_new();

/// Ensure the test database schema is set up (drops and re-runs migrations
/// once per test suite).
pub async fn ensure_schema() {
    SCHEMA_INIT
        .get_or_init(|| async {
            let pool = sqlx::PgPool::connect(&test_db_url()).await.unwrap();
            reset_schema(&pool).await;
            run_migrations(&pool).await;
        })
        .await;
}

/// Connect to the test database (also ensures schema is set up).
pub async fn setup_test_db() -> opsdeck::db::Database {
    ensure_schema().await;
    let db = opsdeck::db::Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(db.pool()).await;
    db
}

/// Build an Axum test app router connected to the test database.
pub async fn build_test_app() -> axum::Router {
    let db = setup_test_db().await;
    let state = opsdeck::dashboard::AppState::with_db(db);
    opsdeck::dashboard::build_router(state, None)
}

/// Truncate all tables to ensure test isolation.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql("TRUNCATE TABLE allocations, equipment, vehicles, projects, workers CASCADE")
        .execute(pool)
        .await
        .unwrap();
}

/// Drop everything the migrations create so reruns start clean.
async fn reset_schema(pool: &sqlx::PgPool) {
    sqlx::raw_sql(
        "DROP TABLE IF EXISTS allocations, equipment, vehicles, projects, workers CASCADE;
         DROP FUNCTION IF EXISTS allocations_require_reference() CASCADE;
         DROP FUNCTION IF EXISTS touch_updated_at() CASCADE;
         DROP FUNCTION IF EXISTS notify_table_change() CASCADE",
    )
    .execute(pool)
    .await
    .unwrap();
}

/// Run all migrations against the test database, skipping Supabase-specific
/// commands.
async fn run_migrations(pool: &sqlx::PgPool) {
    let migration_files = [
        "supabase/migrations/001_create_schema.sql",
        "supabase/migrations/002_change_notifications.sql",
    ];

    for file in &migration_files {
        let path = std::path::Path::new(file);
        if !path.exists() {
            panic!("Migration file not found: {}", file);
        }
        let sql = std::fs::read_to_string(path).unwrap();
        let cleaned = clean_migration_sql(&sql);
        if !cleaned.trim().is_empty() {
            sqlx::raw_sql(&cleaned).execute(pool).await.unwrap_or_else(|e| {
                panic!("Migration {} failed: {}", file, e);
            });
        }
    }
}

/// Remove Supabase-specific SQL (ALTER PUBLICATION, RLS, policies).
fn clean_migration_sql(sql: &str) -> String {
    sql.lines()
        .filter(|line| {
            let t = line.trim();
            !t.starts_with("ALTER PUBLICATION")
                && !t.contains("ENABLE ROW LEVEL SECURITY")
                && !t.starts_with("CREATE POLICY")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
