//! Axum router construction.

use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};
use crate::{accessfiles, apidocs, auth, editions, filemaker, oai};

/// Build the application [`Router`]: every configured integration plus
/// `/health`, `/apidocs` and the JSON 404 fallback.
pub fn build(state: AppState) -> Router {
    let integrations = state.integrations();
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .with_state(state.clone())
        .merge(apidocs::router(apidocs::document(&integrations)));

    if let Some(s) = state.oai {
        app = app.merge(oai::router(s));
    }
    if let Some(s) = state.accessfiles {
        app = app.merge(accessfiles::router(s));
    }
    if let Some(s) = state.filemaker {
        app = app.merge(filemaker::router(s));
    }
    if let Some(s) = state.editions {
        app = app.merge(editions::router(s));
    }
    if let Some(s) = state.auth {
        app = app.merge(auth::router(s));
    }

    app.fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::timeout(state.request_timeout_secs))
        .layer(CompressionLayer::new())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{users::MockUserStore, AuthState, TokenIssuer};

    fn with_auth() -> AppState {
        AppState {
            auth: Some(AuthState {
                users: Arc::new(MockUserStore::new()),
                tokens: Arc::new(TokenIssuer::new("secret", 60, 120)),
            }),
            ..Default::default()
        }
    }

    async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let (status, body) = send(build(AppState::default()), Method::GET, "/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn health_route_exists() {
        let (status, body) = send(build(AppState::default()), Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn disabled_integrations_are_not_mounted() {
        let app = build(AppState::default());
        let (status, _) = send(app.clone(), Method::POST, "/auth/login").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(app, Method::GET, "/oai?verb=Identify").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn enabled_integration_is_mounted_and_documented() {
        let app = build(with_auth());
        let (status, body) = send(app.clone(), Method::POST, "/auth/login").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], "No credentials provided.");

        let (status, body) = send(app.clone(), Method::GET, "/apidocs").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/auth/refresh"]["post"].is_object());
        assert!(body["paths"]["/oai"].is_null());

        let (_, body) = send(app, Method::GET, "/health").await;
        assert_eq!(body["integrations"], serde_json::json!(["auth"]));
    }
}
