//! `SQLite` connection pool and schema bootstrap.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::{AppError, Result};

use super::schema;

/// Alias for the shared `SQLite` pool.
pub type Database = SqlitePool;

const MAX_CONNECTIONS: u32 = 8;

/// Whether `url` names an in-memory database rather than a file.
#[must_use]
pub fn is_memory_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    rest == ":memory:" || rest.starts_with(":memory:?") || rest.contains("mode=memory")
}

/// Open (creating if needed) the database at `url` and apply the schema.
///
/// `url` is either a `sqlite:` URL or a plain file path. Missing parent
/// directories of the database file are created. In-memory URLs are
/// routed to [`connect_memory`].
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema bootstrap fails.
pub async fn connect(url: &str) -> Result<Database> {
    if is_memory_url(url) {
        return connect_memory().await;
    }

    let options = if url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(url)?
    } else {
        SqliteConnectOptions::new().filename(url)
    };
    ensure_parent_dir(options.get_filename())?;
    let options = options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    schema::bootstrap_schema(&pool).await?;
    info!(url, "database ready");
    Ok(pool)
}

fn ensure_parent_dir(file: &Path) -> Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|err| AppError::Db(format!("failed to create db dir: {err}"))),
        _ => Ok(()),
    }
}

/// Open a private in-memory database with the schema applied.
///
/// The pool holds a single connection that is never recycled, so every
/// query sees the same database for the lifetime of the pool.
///
/// # Errors
///
/// Returns `AppError::Db` if the connection or schema bootstrap fails.
pub async fn connect_memory() -> Result<Database> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    schema::bootstrap_schema(&pool).await?;
    Ok(pool)
}
