//! Transparent proxy to the FileMaker Server Data API.
//!
//! Method, headers (except `Host`), query string and body are forwarded to
//! `base_url` + the path after `/filemaker/`. Redirects are returned to the
//! caller rather than followed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderName, Method},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use common::ServiceError;
use reqwest::{redirect, Client};
use tracing::{debug, warn};

use crate::config::FileMakerConfig;
use crate::error::{ApiError, ApiResult};

/// Request headers that describe the inbound hop and are not forwarded.
static SKIPPED_REQUEST_HEADERS: [HeaderName; 3] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Response headers that no longer apply once the body has been buffered.
static SKIPPED_RESPONSE_HEADERS: [HeaderName; 4] = [
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

#[derive(Clone)]
pub struct FileMakerState {
    client: Client,
    base_url: Arc<str>,
}

impl FileMakerState {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cfg: &FileMakerConfig) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build FileMaker HTTP client")?;
        Ok(Self {
            client,
            base_url: Arc::from(cfg.base_url.as_str()),
        })
    }
}

pub fn router(state: FileMakerState) -> Router {
    Router::new()
        .route(
            "/filemaker",
            get(proxy_root).post(proxy_root).put(proxy_root).delete(proxy_root),
        )
        .route(
            "/filemaker/",
            get(proxy_root).post(proxy_root).put(proxy_root).delete(proxy_root),
        )
        .route(
            "/filemaker/*path",
            get(proxy_path).post(proxy_path).put(proxy_path).delete(proxy_path),
        )
        .with_state(state)
}

async fn proxy_root(
    State(state): State<FileMakerState>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    forward(&state, method, "", query, headers, body).await
}

async fn proxy_path(
    State(state): State<FileMakerState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    forward(&state, method, &path, query, headers, body).await
}

fn target_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{base_url}{path}?{q}"),
        _ => format!("{base_url}{path}"),
    }
}

async fn forward(
    state: &FileMakerState,
    method: Method,
    path: &str,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let url = target_url(&state.base_url, path, query.as_deref());
    debug!(%method, path, "proxying request to FileMaker");

    let mut outbound = HeaderMap::with_capacity(headers.len());
    for (name, value) in &headers {
        if !SKIPPED_REQUEST_HEADERS.contains(name) {
            outbound.append(name.clone(), value.clone());
        }
    }

    let upstream = state
        .client
        .request(method, &url)
        .headers(outbound)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "FileMaker request failed");
            ApiError(ServiceError::Upstream("FileMaker server unreachable".into()))
        })?;

    let status = upstream.status();
    let mut response_headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers() {
        if !SKIPPED_RESPONSE_HEADERS.contains(name) {
            response_headers.append(name.clone(), value.clone());
        }
    }
    let bytes = upstream.bytes().await.map_err(|e| {
        warn!(error = %e, "failed to read FileMaker response");
        ApiError(ServiceError::Upstream("FileMaker response interrupted".into()))
    })?;

    Ok((status, response_headers, Body::from(bytes)).into_response())
}
