//! Bearer-token gate for the administrative API.
//!
//! Every request under `/api` must carry `Authorization: Bearer <secret>`
//! where `<secret>` equals the configured admin secret. The check is pure
//! and stateless; a rejected request gets a JSON error and never reaches
//! the downstream handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::http::{AppState, ErrorBody};

/// Authorization scheme accepted by the gate.
pub const BEARER_SCHEME: &str = "Bearer";

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization` header was sent.
    MissingHeader,
    /// The header is not a two-token `Bearer <token>` value.
    MalformedHeader,
    /// The token does not match the configured secret.
    InvalidToken,
}

impl AuthRejection {
    /// HTTP status returned for this rejection.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::MissingHeader | Self::MalformedHeader => StatusCode::UNAUTHORIZED,
            Self::InvalidToken => StatusCode::FORBIDDEN,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_authorization",
            Self::MalformedHeader => "invalid_format",
            Self::InvalidToken => "invalid_token",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::MissingHeader => "Authorization header is required",
            Self::MalformedHeader => "Authorization header must be 'Bearer <token>'",
            Self::InvalidToken => "Invalid API token",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                error: self.code().to_owned(),
                message: self.message().to_owned(),
            }),
        )
            .into_response()
    }
}

/// Extract the token from a `Bearer <token>` header value.
///
/// Returns `None` unless the value splits into exactly two whitespace
/// separated tokens and the first is the `Bearer` scheme (any ASCII case).
#[must_use]
pub fn extract_bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }
    Some(token)
}

/// Decide whether a request carrying `header` may proceed.
///
/// # Errors
///
/// Returns the [`AuthRejection`] describing why the request is refused.
pub fn check_authorization(header: Option<&str>, secret: &str) -> Result<(), AuthRejection> {
    let value = header.ok_or(AuthRejection::MissingHeader)?;
    let token = extract_bearer_token(value).ok_or(AuthRejection::MalformedHeader)?;
    if bool::from(token.as_bytes().ct_eq(secret.as_bytes())) {
        Ok(())
    } else {
        Err(AuthRejection::InvalidToken)
    }
}

/// Apply [`check_authorization`] to a header map.
///
/// A header that is present but not visible ASCII counts as malformed.
///
/// # Errors
///
/// Returns the [`AuthRejection`] describing why the request is refused.
pub fn authorize_headers(headers: &HeaderMap, secret: &str) -> Result<(), AuthRejection> {
    match headers.get(header::AUTHORIZATION) {
        None => check_authorization(None, secret),
        Some(raw) => {
            let value = raw.to_str().map_err(|_| AuthRejection::MalformedHeader)?;
            check_authorization(Some(value), secret)
        }
    }
}

/// Axum middleware enforcing the gate in front of `next`.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match authorize_headers(request.headers(), &state.config.auth_secret) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = rejection.code(),
                "admin request rejected"
            );
            rejection.into_response()
        }
    }
}
