//! Service-level handlers: health and the 404 fallback.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse};
use tracing::warn;

use super::state::AppState;

/// `GET /health`: liveness plus the list of mounted integrations.
///
/// Returns `503 Service Unavailable` with status `degraded` when access files
/// are enabled but the allow-list is empty, since every file request would
/// then be refused.
pub async fn health(State(state): State<AppState>) -> Response {
    let allowlist_entries = state.allowlist().map_or(0, |list| list.len());
    let degraded = state.allowlist().is_some() && allowlist_entries == 0;

    let (status_code, status_str) = if degraded {
        warn!("health check degraded: access-file allow-list is empty");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "ok")
    };

    let body = HealthResponse {
        status: status_str.into(),
        integrations: state.integrations().into_iter().map(str::to_owned).collect(),
        allowlist_entries,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
