//! Server bootstrap failure modes.

use std::sync::Arc;

use ota_relay::http::server::serve;
use ota_relay::http::AppState;
use ota_relay::persistence::db;
use ota_relay::AppError;
use tokio_util::sync::CancellationToken;

use super::test_helpers::test_config;

#[tokio::test]
async fn serve_fails_when_port_is_taken() {
    let holder = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind holder");
    let port = holder.local_addr().expect("addr").port();

    let mut config = test_config(None);
    config.port = port;
    let state = Arc::new(AppState {
        config: Arc::new(config),
        db: Arc::new(db::connect_memory().await.expect("db")),
    });

    let result = serve(state, CancellationToken::new()).await;
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[tokio::test]
async fn file_database_is_created_on_connect() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("data").join("relay.db");

    db::connect(path.to_str().expect("utf8"))
        .await
        .expect("connect creates file");

    assert!(path.exists());
}

#[tokio::test]
async fn sqlite_url_creates_missing_directories() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("deeper").join("relay.db");
    let url = format!("sqlite:{}", path.to_str().expect("utf8"));

    db::connect(&url).await.expect("connect creates directories");

    assert!(path.exists());
}

#[tokio::test]
async fn memory_url_keeps_one_database_across_queries() {
    use ota_relay::models::bundle::BundleFilter;
    use ota_relay::persistence::bundle_repo::BundleRepo;
    use ota_relay::persistence::settings_repo::SettingsRepo;

    let pool = Arc::new(db::connect("sqlite::memory:").await.expect("memory db"));
    let repo = BundleRepo::new(Arc::clone(&pool));

    let filter = BundleFilter::default();
    let (first, second) = tokio::join!(repo.count(&filter), repo.count(&filter),);
    assert_eq!(first.expect("schema present"), 0);
    assert_eq!(second.expect("schema present"), 0);

    let version = SettingsRepo::new(pool)
        .schema_version()
        .await
        .expect("seeded");
    assert_eq!(version, "1");
}

#[test]
fn memory_urls_are_recognised() {
    assert!(db::is_memory_url("sqlite::memory:"));
    assert!(db::is_memory_url(":memory:"));
    assert!(db::is_memory_url("sqlite://:memory:"));
    assert!(db::is_memory_url("sqlite:file:relay?mode=memory&cache=shared"));
    assert!(!db::is_memory_url("sqlite:data/relay.db"));
    assert!(!db::is_memory_url("relay.db"));
}
