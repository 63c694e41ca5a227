//! Administrative bundle and channel handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::models::bundle::{Bundle, BundleFilter, NewBundle, Platform};
use crate::models::pagination::{clamp_limit, Pagination};
use crate::persistence::bundle_repo::BundleRepo;
use crate::{AppError, Result};

/// Query string accepted by `GET /api/bundles`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Channel filter.
    pub channel: Option<String>,
    /// Platform filter (`ios` or `android`).
    pub platform: Option<String>,
    /// Page size.
    pub limit: Option<u32>,
    /// Rows to skip.
    pub offset: Option<u32>,
}

impl ListParams {
    /// Normalize into a repository filter.
    ///
    /// Empty strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown platform.
    pub fn into_filter(self) -> Result<BundleFilter> {
        let platform = self
            .platform
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<Platform>())
            .transpose()?;
        Ok(BundleFilter {
            channel: self.channel.filter(|c| !c.is_empty()),
            platform,
            limit: clamp_limit(self.limit),
            offset: self.offset.unwrap_or(0),
        })
    }
}

/// One page of bundles.
#[derive(Debug, Serialize, Deserialize)]
pub struct BundlePage {
    /// Bundles on this page.
    pub data: Vec<Bundle>,
    /// Window description.
    pub pagination: Pagination,
}

/// Body of `POST /api/bundles`: a single bundle or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateBody {
    /// Batch upsert.
    Many(Vec<NewBundle>),
    /// Single upsert.
    One(Box<NewBundle>),
}

/// Response of `POST /api/bundles`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Ids of the stored bundles, in request order.
    pub ids: Vec<String>,
}

/// Response of `DELETE /api/bundles/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Always `true` on success.
    pub success: bool,
}

fn repo(state: &AppState) -> BundleRepo {
    BundleRepo::new(Arc::clone(&state.db))
}

/// `GET /api/bundles`
///
/// # Errors
///
/// Returns a validation error for bad query parameters and `AppError::Db`
/// if the query fails.
pub async fn list(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<BundlePage>> {
    let Query(params) = params?;
    let filter = params.into_filter()?;
    let repo = repo(&state);
    let total = repo.count(&filter).await?;
    let data = repo.list(&filter).await?;
    Ok(Json(BundlePage {
        data,
        pagination: Pagination::new(total, filter.limit, filter.offset),
    }))
}

/// `GET /api/bundles/{id}`
///
/// # Errors
///
/// Returns `AppError::NotFound` if no bundle has that id.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Bundle>> {
    Ok(Json(repo(&state).get_by_id(&id).await?))
}

/// `POST /api/bundles`
///
/// Every entry is validated before anything is written; one bad entry
/// rejects the whole batch.
///
/// # Errors
///
/// Returns `AppError::Validation` for a malformed or invalid body.
pub async fn create(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateResponse>)> {
    let Json(body) = body?;
    let payloads = match body {
        CreateBody::Many(items) => items,
        CreateBody::One(item) => vec![*item],
    };
    if payloads.is_empty() {
        return Err(AppError::Validation("no bundles supplied".into()));
    }

    let bundles = payloads
        .into_iter()
        .map(|payload| {
            let bundle = payload.into_bundle()?;
            if !state.config.storage.owns_uri(&bundle.storage_uri) {
                return Err(AppError::Validation(format!(
                    "storage_uri {} is outside the configured bucket",
                    bundle.storage_uri
                )));
            }
            Ok(bundle)
        })
        .collect::<Result<Vec<_>>>()?;

    repo(&state).upsert_many(&bundles).await?;
    let ids: Vec<String> = bundles.into_iter().map(|b| b.id).collect();
    info!(count = ids.len(), "bundles upserted");
    Ok((StatusCode::CREATED, Json(CreateResponse { success: true, ids })))
}

/// `DELETE /api/bundles/{id}`
///
/// # Errors
///
/// Returns `AppError::NotFound` if no bundle has that id.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    repo(&state).delete(&id).await?;
    info!(bundle_id = %id, "bundle deleted");
    Ok(Json(DeleteResponse { success: true }))
}

/// `GET /api/channels`
///
/// # Errors
///
/// Returns `AppError::Db` if the query fails.
pub async fn channels(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
    Ok(Json(repo(&state).list_channels().await?))
}
