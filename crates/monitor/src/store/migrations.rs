use chrono::Utc;
use libsql::{Connection, params};

use super::StoreError;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i64 = 1;

/// Bring the schema up to [`SCHEMA_VERSION`]. Safe to run on every start.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;
    if current_version >= SCHEMA_VERSION {
        tracing::debug!(version = current_version, "database schema is up to date");
        return Ok(());
    }

    tracing::info!(from = current_version, to = SCHEMA_VERSION, "running migrations");

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Samples, service state and alert config").await?;
    }

    Ok(())
}

async fn get_current_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn.query("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", ()).await?;

    match rows.next().await? {
        Some(row) => Ok(row.get::<i64>(0)?),
        None => Ok(0),
    }
}

async fn record_migration(
    conn: &Connection,
    version: i64,
    description: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?1, ?2, ?3)",
        params![version, Utc::now().to_rfc3339(), description],
    )
    .await?;

    tracing::info!(version, description, "applied migration");
    Ok(())
}

/// Migration v1: initial schema
async fn run_migration_v1(conn: &Connection) -> Result<(), StoreError> {
    // taken_at is fixed-width RFC 3339 UTC, so text order is time order
    conn.execute(
        "CREATE TABLE IF NOT EXISTS samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            taken_at TEXT NOT NULL,
            service_key TEXT NOT NULL,
            ok INTEGER NOT NULL,
            http_status INTEGER NOT NULL DEFAULT 0,
            latency_ms INTEGER
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_samples_service_time ON samples(service_key, taken_at)",
        (),
    )
    .await?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_samples_time ON samples(taken_at)", ()).await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS service_state (
            service_key TEXT PRIMARY KEY,
            disabled INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS alert_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            config TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )
    .await?;

    Ok(())
}
