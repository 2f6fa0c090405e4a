//! Axum middleware layers applied to the router.
//!
//! Request tracing, timeout enforcement and response compression wrap every
//! route; the digital-edition routes additionally answer cross-origin requests.

use std::time::Duration;

use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

static CORS_ALLOWED_HEADERS: [HeaderName; 5] = [
    HeaderName::from_static("x-requested-with"),
    header::CONTENT_TYPE,
    header::ACCEPT,
    header::ORIGIN,
    header::AUTHORIZATION,
];

/// Per-request timeout; slower requests are answered with 408.
pub fn timeout(secs: u64) -> TimeoutLayer {
    TimeoutLayer::new(Duration::from_secs(secs))
}

/// Read-only CORS policy open to any origin.
pub fn public_read_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(CORS_ALLOWED_HEADERS.clone())
}
