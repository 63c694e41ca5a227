//! Bundle repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::bundle::{Bundle, BundleFilter, Platform};
use crate::{AppError, Result};

use super::db::Database;

const SELECT_COLUMNS: &str = "SELECT id, platform, enabled, should_force_update, file_hash,
        git_commit_hash, message, channel, storage_uri, target_app_version,
        fingerprint_hash, metadata
 FROM bundles";

const UPSERT_SQL: &str = "INSERT OR REPLACE INTO bundles (id, platform, enabled, should_force_update,
        file_hash, git_commit_hash, message, channel, storage_uri, target_app_version,
        fingerprint_hash, metadata)
 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

/// Repository wrapper around `SQLite` for bundle records.
#[derive(Clone)]
pub struct BundleRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct BundleRow {
    id: String,
    platform: String,
    enabled: i64,
    should_force_update: i64,
    file_hash: String,
    git_commit_hash: Option<String>,
    message: Option<String>,
    channel: String,
    storage_uri: String,
    target_app_version: Option<String>,
    fingerprint_hash: Option<String>,
    metadata: String,
}

impl BundleRow {
    fn into_bundle(self) -> Result<Bundle> {
        let platform: Platform = self
            .platform
            .parse()
            .map_err(|err| AppError::Db(format!("stored bundle {}: {err}", self.id)))?;
        let metadata = serde_json::from_str(&self.metadata)
            .map_err(|err| AppError::Db(format!("stored bundle {} metadata: {err}", self.id)))?;

        Ok(Bundle {
            id: self.id,
            platform,
            enabled: self.enabled != 0,
            should_force_update: self.should_force_update != 0,
            file_hash: self.file_hash,
            git_commit_hash: self.git_commit_hash,
            message: self.message,
            channel: self.channel,
            storage_uri: self.storage_uri,
            target_app_version: self.target_app_version,
            fingerprint_hash: self.fingerprint_hash,
            metadata,
        })
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn upsert_query(bundle: &Bundle) -> SqliteQuery<'_> {
    sqlx::query(UPSERT_SQL)
        .bind(&bundle.id)
        .bind(bundle.platform.as_str())
        .bind(i64::from(bundle.enabled))
        .bind(i64::from(bundle.should_force_update))
        .bind(&bundle.file_hash)
        .bind(&bundle.git_commit_hash)
        .bind(&bundle.message)
        .bind(&bundle.channel)
        .bind(&bundle.storage_uri)
        .bind(&bundle.target_app_version)
        .bind(&bundle.fingerprint_hash)
        .bind(bundle.metadata.to_string())
}

impl BundleRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace a single bundle.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn insert(&self, bundle: &Bundle) -> Result<Bundle> {
        upsert_query(bundle).execute(self.db.as_ref()).await?;
        Ok(bundle.clone())
    }

    /// Insert or replace several bundles in one transaction.
    ///
    /// Either every bundle is written or none is.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if any write fails.
    pub async fn upsert_many(&self, bundles: &[Bundle]) -> Result<u64> {
        let mut tx = self.db.begin().await?;
        let mut written = 0;
        for bundle in bundles {
            written += upsert_query(bundle).execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Retrieve a bundle by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the bundle does not exist.
    pub async fn get_by_id(&self, id: &str) -> Result<Bundle> {
        let query = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row: Option<BundleRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.ok_or_else(|| AppError::NotFound(format!("bundle {id}")))?
            .into_bundle()
    }

    /// List one page of bundles, newest id first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list(&self, filter: &BundleFilter) -> Result<Vec<Bundle>> {
        let query = format!(
            "{SELECT_COLUMNS}
             WHERE (?1 IS NULL OR channel = ?1) AND (?2 IS NULL OR platform = ?2)
             ORDER BY id DESC
             LIMIT ?3 OFFSET ?4"
        );
        let rows: Vec<BundleRow> = sqlx::query_as(&query)
            .bind(filter.channel.as_deref())
            .bind(filter.platform.map(Platform::as_str))
            .bind(i64::from(filter.limit))
            .bind(i64::from(filter.offset))
            .fetch_all(self.db.as_ref())
            .await?;
        rows.into_iter().map(BundleRow::into_bundle).collect()
    }

    /// Count bundles matching the filter, ignoring its page window.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self, filter: &BundleFilter) -> Result<u64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bundles
             WHERE (?1 IS NULL OR channel = ?1) AND (?2 IS NULL OR platform = ?2)",
        )
        .bind(filter.channel.as_deref())
        .bind(filter.platform.map(Platform::as_str))
        .fetch_one(self.db.as_ref())
        .await?;
        u64::try_from(row.0).map_err(|err| AppError::Db(format!("negative count: {err}")))
    }

    /// Delete a bundle by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no bundle has that id.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM bundles WHERE id = ?1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("bundle {id}")));
        }
        Ok(())
    }

    /// Distinct channel names in ascending order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_channels(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT channel FROM bundles ORDER BY channel ASC")
                .fetch_all(self.db.as_ref())
                .await?;
        Ok(rows.into_iter().map(|(channel,)| channel).collect())
    }
}
