//! Key/value settings repository.

use std::sync::Arc;

use crate::{AppError, Result};

use super::db::Database;
use super::schema::SCHEMA_VERSION_KEY;

/// Repository for the `settings` table.
#[derive(Clone)]
pub struct SettingsRepo {
    db: Arc<Database>,
}

impl SettingsRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Read a setting, `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.db.as_ref())
            .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Write a setting, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Schema version recorded at bootstrap.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the row is missing or the query fails.
    pub async fn schema_version(&self) -> Result<String> {
        self.get(SCHEMA_VERSION_KEY)
            .await?
            .ok_or_else(|| AppError::Db("schema_version setting missing".into()))
    }
}
