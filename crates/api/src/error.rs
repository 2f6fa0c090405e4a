//! HTTP rendering of [`ServiceError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorResponse;
use common::ServiceError;
use tracing::error;

use crate::db::StoreError;

/// Wrapper that lets handlers return `Result<_, ApiError>` and have failures
/// rendered as `{code, message}` JSON with the matching status.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "database request failed");
        match e {
            StoreError::Unreachable(_) => Self(ServiceError::Unavailable("database unavailable".into())),
            StoreError::Query(_) => Self(ServiceError::Internal("database query failed".into())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
