use std::sync::Arc;

use ota_relay::models::bundle::{Bundle, BundleFilter, Platform};
use ota_relay::persistence::bundle_repo::BundleRepo;
use ota_relay::persistence::db;
use ota_relay::AppError;
use uuid::Uuid;

fn bundle(platform: Platform, channel: &str) -> Bundle {
    Bundle {
        id: Uuid::now_v7().to_string(),
        platform,
        enabled: true,
        should_force_update: false,
        file_hash: "hash".into(),
        git_commit_hash: None,
        message: Some("release".into()),
        channel: channel.into(),
        storage_uri: "s3://bundles/key.zip".into(),
        target_app_version: Some("1.0.0".into()),
        fingerprint_hash: None,
        metadata: serde_json::json!({"source": "test"}),
    }
}

fn all(limit: u32) -> BundleFilter {
    BundleFilter {
        limit,
        ..BundleFilter::default()
    }
}

async fn repo() -> BundleRepo {
    let pool = db::connect_memory().await.expect("db connect");
    BundleRepo::new(Arc::new(pool))
}

#[tokio::test]
async fn in_memory_connect_creates_tables() {
    let pool = db::connect_memory()
        .await
        .expect("in-memory connect should succeed");

    for table in ["bundles", "settings"] {
        let query = format!("SELECT COUNT(*) AS cnt FROM {table}");
        let row: (i64,) = sqlx::query_as(&query)
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("table '{table}' should be queryable: {e}"));
        assert!(row.0 >= 0);
    }
}

#[tokio::test]
async fn insert_and_get_round_trips_every_field() {
    let repo = repo().await;
    let mut original = bundle(Platform::Ios, "production");
    original.should_force_update = true;
    original.git_commit_hash = Some("abc123".into());
    original.fingerprint_hash = Some("fp".into());

    repo.insert(&original).await.expect("insert");
    let fetched = repo.get_by_id(&original.id).await.expect("fetch");

    assert_eq!(fetched, original);
}

#[tokio::test]
async fn missing_bundle_is_not_found() {
    let repo = repo().await;
    let result = repo.get_by_id("00000000-0000-0000-0000-000000000000").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_orders_newest_first_and_pages() {
    let repo = repo().await;
    let bundles: Vec<Bundle> = (0..5)
        .map(|_| bundle(Platform::Ios, "production"))
        .collect();
    repo.upsert_many(&bundles).await.expect("upsert");
    let mut newest_first: Vec<String> = bundles.iter().map(|b| b.id.clone()).collect();
    newest_first.sort_unstable_by(|a, b| b.cmp(a));

    let first = repo.list(&all(2)).await.expect("page 1");
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id, newest_first[0]);
    assert_eq!(first[1].id, newest_first[1]);

    let last = repo
        .list(&BundleFilter {
            limit: 2,
            offset: 4,
            ..BundleFilter::default()
        })
        .await
        .expect("page 3");
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].id, newest_first[4]);

    assert_eq!(repo.count(&all(2)).await.expect("count"), 5);
}

#[tokio::test]
async fn list_filters_by_channel_and_platform() {
    let repo = repo().await;
    repo.upsert_many(&[
        bundle(Platform::Ios, "production"),
        bundle(Platform::Android, "production"),
        bundle(Platform::Ios, "beta"),
    ])
    .await
    .expect("upsert");

    let ios_prod = BundleFilter {
        channel: Some("production".into()),
        platform: Some(Platform::Ios),
        limit: 10,
        offset: 0,
    };
    let rows = repo.list(&ios_prod).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].platform, Platform::Ios);
    assert_eq!(rows[0].channel, "production");

    let beta = BundleFilter {
        channel: Some("beta".into()),
        limit: 10,
        ..BundleFilter::default()
    };
    assert_eq!(repo.count(&beta).await.expect("count"), 1);

    let android = BundleFilter {
        platform: Some(Platform::Android),
        limit: 10,
        ..BundleFilter::default()
    };
    assert_eq!(repo.count(&android).await.expect("count"), 1);
}

#[tokio::test]
async fn upsert_replaces_existing_row() {
    let repo = repo().await;
    let mut b = bundle(Platform::Android, "production");
    repo.insert(&b).await.expect("insert");

    b.enabled = false;
    b.message = Some("rolled back".into());
    repo.upsert_many(std::slice::from_ref(&b)).await.expect("upsert");

    let fetched = repo.get_by_id(&b.id).await.expect("fetch");
    assert!(!fetched.enabled);
    assert_eq!(fetched.message.as_deref(), Some("rolled back"));
    assert_eq!(repo.count(&all(10)).await.expect("count"), 1);
}

#[tokio::test]
async fn delete_removes_and_reports_missing() {
    let repo = repo().await;
    let b = bundle(Platform::Ios, "production");
    repo.insert(&b).await.expect("insert");

    repo.delete(&b.id).await.expect("delete");
    assert!(matches!(
        repo.get_by_id(&b.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(repo.delete(&b.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn channels_are_distinct_and_sorted() {
    let repo = repo().await;
    assert!(repo.list_channels().await.expect("empty").is_empty());

    repo.upsert_many(&[
        bundle(Platform::Ios, "staging"),
        bundle(Platform::Android, "production"),
        bundle(Platform::Ios, "production"),
        bundle(Platform::Ios, "beta"),
    ])
    .await
    .expect("upsert");

    assert_eq!(
        repo.list_channels().await.expect("channels"),
        vec!["beta", "production", "staging"]
    );
}

#[tokio::test]
async fn file_database_persists_across_connections() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("relay.db");
    let path = path.to_str().expect("utf8 path");
    let b = bundle(Platform::Ios, "production");

    {
        let pool = db::connect(path).await.expect("connect");
        BundleRepo::new(Arc::new(pool.clone()))
            .insert(&b)
            .await
            .expect("insert");
        pool.close().await;
    }

    let pool = db::connect(path).await.expect("reconnect");
    let fetched = BundleRepo::new(Arc::new(pool))
        .get_by_id(&b.id)
        .await
        .expect("fetch after reconnect");
    assert_eq!(fetched.id, b.id);
}
