//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`, so bootstrap is
//! safe to re-run on every server startup.

use sqlx::SqlitePool;

use crate::Result;

/// Schema version written to `settings` on first bootstrap.
pub const SCHEMA_VERSION: &str = "1";

/// Settings key holding the schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Apply all table definitions and seed the schema version.
///
/// # Errors
///
/// Returns `AppError::Db` if any statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS bundles (
    id                  TEXT PRIMARY KEY NOT NULL,
    platform            TEXT NOT NULL CHECK(platform IN ('ios','android')),
    enabled             INTEGER NOT NULL DEFAULT 1,
    should_force_update INTEGER NOT NULL DEFAULT 0,
    file_hash           TEXT NOT NULL,
    git_commit_hash     TEXT,
    message             TEXT,
    channel             TEXT NOT NULL DEFAULT 'production',
    storage_uri         TEXT NOT NULL,
    target_app_version  TEXT,
    fingerprint_hash    TEXT,
    metadata            TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS settings (
    key     TEXT PRIMARY KEY NOT NULL,
    value   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bundles_channel ON bundles(channel);
CREATE INDEX IF NOT EXISTS idx_bundles_platform ON bundles(platform);
";

    sqlx::raw_sql(ddl).execute(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)")
        .bind(SCHEMA_VERSION_KEY)
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;
    Ok(())
}
