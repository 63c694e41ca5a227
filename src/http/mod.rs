//! HTTP surface: shared state, router assembly, and JSON error bodies.
//!
//! Public routes (`/health`, `/version`) are open. Everything under `/api`
//! sits behind [`crate::auth::require_bearer`].

use std::sync::Arc;

use axum::extract::State;
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, HttpMakeClassifier, TraceLayer};
use tracing::Level;

use crate::auth;
use crate::config::GlobalConfig;
use crate::persistence::db::Database;
use crate::persistence::settings_repo::SettingsRepo;
use crate::Result;

pub mod bundles;
pub mod error;
pub mod server;

/// State shared by every request handler.
pub struct AppState {
    /// Immutable process configuration, including the admin secret.
    pub config: Arc<GlobalConfig>,
    /// Shared `SQLite` pool.
    pub db: Arc<Database>,
}

/// JSON body returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

/// Response body of `GET /version`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionInfo {
    /// Server package version.
    pub version: String,
    /// Schema version recorded in the database.
    pub schema_version: String,
}

/// Build the full application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/bundles", get(bundles::list).post(bundles::create))
        .route("/bundles/{id}", get(bundles::get).delete(bundles::delete))
        .route("/channels", get(bundles::channels))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .nest("/api", admin)
        .layer(request_trace_layer())
        .with_state(state)
}

/// Per-request spans and response events, visible at the default `info` filter.
fn request_trace_layer() -> TraceLayer<HttpMakeClassifier> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Handler for `GET /version`.
async fn version(State(state): State<Arc<AppState>>) -> Result<Json<VersionInfo>> {
    let schema_version = SettingsRepo::new(Arc::clone(&state.db))
        .schema_version()
        .await?;
    Ok(Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_owned(),
        schema_version,
    }))
}
