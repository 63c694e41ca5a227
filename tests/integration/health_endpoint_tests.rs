//! Integration tests for the live HTTP listener.
//!
//! Binds an ephemeral port so the tests never collide with a running
//! instance, then talks to the server over a real socket.

use std::io::Write;
use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use tokio_util::sync::CancellationToken;

use ota_relay::http::server::serve_with_listener;

use super::test_helpers::{send, test_app_state, test_config, test_router, TEST_SECRET};

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Spawn the server on an ephemeral port, returning its base URL.
///
/// Caller must cancel the returned token to shut the server down.
async fn spawn_server() -> (String, CancellationToken, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    let state = test_app_state(test_config(None)).await;
    let ct = CancellationToken::new();

    let server_ct = ct.clone();
    let handle = tokio::spawn(async move {
        serve_with_listener(listener, state, server_ct)
            .await
            .expect("server runs");
    });

    (format!("http://{addr}"), ct, handle)
}

#[tokio::test]
async fn health_returns_ok() {
    let (base_url, ct, handle) = spawn_server().await;

    let resp = reqwest::get(format!("{base_url}/health"))
        .await
        .expect("HTTP GET /health");

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "ok");

    ct.cancel();
    handle.await.expect("server task joins");
}

#[tokio::test]
async fn non_existent_route_returns_404() {
    let (base_url, ct, handle) = spawn_server().await;

    let resp = reqwest::get(format!("{base_url}/nonexistent"))
        .await
        .expect("HTTP GET /nonexistent");

    assert_eq!(resp.status(), 404);
    ct.cancel();
    handle.await.expect("server task joins");
}

#[tokio::test]
async fn bearer_auth_over_the_wire() {
    let (base_url, ct, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let denied = client
        .get(format!("{base_url}/api/channels"))
        .send()
        .await
        .expect("request without token");
    assert_eq!(denied.status(), 401);

    let allowed = client
        .get(format!("{base_url}/api/channels"))
        .bearer_auth(TEST_SECRET)
        .send()
        .await
        .expect("request with token");
    assert_eq!(allowed.status(), 200);

    ct.cancel();
    handle.await.expect("server task joins");
}

#[tokio::test]
async fn requests_are_logged_at_info() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = test_router().await;
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let output = String::from_utf8(logs.0.lock().expect("log buffer").clone()).expect("utf8");
    assert!(
        output.contains("finished processing request"),
        "missing response event in: {output}"
    );
    assert!(output.contains("/health"), "missing request uri in: {output}");
}
