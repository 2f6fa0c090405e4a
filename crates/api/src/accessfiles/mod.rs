//! Access files served from OpenStack Swift.
//!
//! Only object paths on the allow-list are served; anything else is a 404
//! before Swift is contacted.

pub mod allowlist;
pub mod swift;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use common::ServiceError;
use tracing::{info, warn};

pub use allowlist::AllowList;
pub use swift::{SwiftClient, SwiftError};

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AccessFilesState {
    pub allowlist: AllowList,
    pub swift: Arc<SwiftClient>,
}

impl From<SwiftError> for ApiError {
    fn from(e: SwiftError) -> Self {
        match e {
            SwiftError::NotFound => ApiError(ServiceError::NotFound("file not found".into())),
            other => {
                warn!(error = %other, "Swift fetch failed");
                ApiError(ServiceError::Upstream("file storage unavailable".into()))
            }
        }
    }
}

pub fn router(state: AccessFilesState) -> Router {
    Router::new()
        .route("/accessfiles/*file_path", get(get_file))
        .with_state(state)
}

/// `GET /accessfiles/*file_path`: stream an allow-listed object from Swift.
pub async fn get_file(
    State(state): State<AccessFilesState>,
    Path(file_path): Path<String>,
) -> ApiResult<Response> {
    if !state.allowlist.contains(&file_path) {
        warn!(path = %file_path, "requested file is not on the allow-list");
        return Err(ServiceError::NotFound("file not found".into()).into());
    }

    let upstream = state.swift.fetch(&file_path).await?;
    info!(path = %file_path, "serving access file from Swift");

    let mime = mime_guess::from_path(&file_path).first_or_octet_stream();
    let body = Body::from_stream(upstream.bytes_stream());
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, mime.to_string())], body).into_response())
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::swift::tests::{config, mount_auth};
    use super::*;
    use axum_test::TestServer;

    async fn app(server: &MockServer, allowed: &str) -> TestServer {
        let allowlist = AllowList::new();
        allowlist.replace(allowlist::parse(allowed));
        let swift = SwiftClient::new(&config(server)).unwrap();
        let state = AccessFilesState {
            allowlist,
            swift: Arc::new(swift),
        };
        TestServer::new(router(state)).unwrap()
    }

    #[tokio::test]
    async fn serves_allowed_file_with_guessed_type() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/AUTH_sls/arkiv/bild.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .mount(&server)
            .await;

        let resp = app(&server, "arkiv/bild.jpg\n")
            .await
            .get("/accessfiles/arkiv/bild.jpg")
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.header(header::CONTENT_TYPE), "image/jpeg");
        assert_eq!(resp.as_bytes().as_ref(), b"jpegdata");
    }

    #[tokio::test]
    async fn unknown_extension_is_octet_stream() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/AUTH_sls/data.zzqx"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let resp = app(&server, "data.zzqx").await.get("/accessfiles/data.zzqx").await;
        resp.assert_status_ok();
        assert_eq!(resp.header(header::CONTENT_TYPE), "application/octet-stream");
    }

    #[tokio::test]
    async fn file_not_on_list_is_404_without_swift() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok", 0).await;

        let resp = app(&server, "other.jpg").await.get("/accessfiles/secret.jpg").await;
        resp.assert_status_not_found();
    }

    #[tokio::test]
    async fn swift_failure_is_502() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1.0"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let resp = app(&server, "a.jpg").await.get("/accessfiles/a.jpg").await;
        resp.assert_status(StatusCode::BAD_GATEWAY);
        let body: common::protocol::ErrorResponse = resp.json();
        assert_eq!(body.code, "bad_gateway");
    }
}
