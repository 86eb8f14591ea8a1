//! Request middleware.
//!
//! ## Layer Order
//! ```text
//! request ──► TraceLayer ──► track_metrics ──► require_bearer ──► handler
//!                                 │                  │
//!                                 │                  └─ protected routes only
//!                                 └─ every route except /metrics
//! ```
//!
//! `track_metrics` sits outside `require_bearer`, so rejected requests are
//! counted with their 401.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::auth::{extract_bearer_token, AuthenticatedSubject};
use crate::error::ApiError;
use crate::AppState;

/// Rejects requests without a valid bearer token.
///
/// On success the token subject is attached as [`AuthenticatedSubject`].
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed authorization header".to_string()))?;

    let token = extract_bearer_token(header)
        .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;

    let subject = state.auth.verify(token)?;
    debug!(subject = %subject, "Bearer token accepted");

    request.extensions_mut().insert(AuthenticatedSubject(subject));
    Ok(next.run(request).await)
}

/// Path label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Records request count, latency and emitted status.
///
/// Labels are bounded: the path is the matched route template, and the
/// method is one of the standard verbs or `OTHER`.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_PATH.to_owned());
    let method = method_label(request.method());

    state
        .metrics
        .observe(&path, method, next.run(request))
        .await
}

fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}
