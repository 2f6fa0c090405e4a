//! OpenStack Swift client using v1 (`X-Auth-User`/`X-Auth-Key`) authentication.
//!
//! The auth token and storage URL are cached and reused across requests. An
//! object request answered with 401 drops the cached session, re-authenticates
//! once and retries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwapOption;
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SwiftConfig;

#[derive(Debug, Error)]
pub enum SwiftError {
    #[error("object not found in Swift")]
    NotFound,

    #[error("Swift authentication failed: {0}")]
    Auth(String),

    #[error("Swift request failed: {0}")]
    Upstream(String),
}

#[derive(Debug)]
struct Session {
    token: String,
    storage_url: String,
}

pub struct SwiftClient {
    http: Client,
    auth_url: String,
    username: String,
    password: String,
    session: ArcSwapOption<Session>,
}

impl SwiftClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cfg: &SwiftConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .build()
            .context("failed to build Swift HTTP client")?;
        Ok(Self {
            http,
            auth_url: cfg.auth_url.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            session: ArcSwapOption::empty(),
        })
    }

    async fn authenticate(&self) -> Result<Arc<Session>, SwiftError> {
        let resp = self
            .http
            .get(&self.auth_url)
            .header("X-Auth-User", &self.username)
            .header("X-Auth-Key", &self.password)
            .send()
            .await
            .map_err(|e| SwiftError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SwiftError::Auth(format!("auth endpoint returned {}", resp.status())));
        }

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
                .ok_or_else(|| SwiftError::Auth(format!("missing {name} header")))
        };
        let session = Arc::new(Session {
            token: header("X-Auth-Token")?,
            storage_url: header("X-Storage-Url")?,
        });
        info!(storage_url = %session.storage_url, "authenticated to Swift");
        self.session.store(Some(session.clone()));
        Ok(session)
    }

    async fn session(&self) -> Result<Arc<Session>, SwiftError> {
        match self.session.load_full() {
            Some(s) => Ok(s),
            None => self.authenticate().await,
        }
    }

    async fn get_object(&self, session: &Session, path: &str) -> Result<Response, SwiftError> {
        let url = format!("{}/{}", session.storage_url.trim_end_matches('/'), path);
        self.http
            .get(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| SwiftError::Upstream(e.to_string()))
    }

    /// Start fetching `path`. The returned response has a success status and
    /// an unread body.
    ///
    /// # Errors
    ///
    /// [`SwiftError::NotFound`] when Swift has no such object, otherwise
    /// [`SwiftError::Auth`] or [`SwiftError::Upstream`].
    pub async fn fetch(&self, path: &str) -> Result<Response, SwiftError> {
        let session = self.session().await?;
        let mut resp = self.get_object(&session, path).await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("Swift token rejected; re-authenticating");
            self.session.store(None);
            let session = self.authenticate().await?;
            resp = self.get_object(&session, path).await?;
        }

        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::NOT_FOUND => Err(SwiftError::NotFound),
            s => Err(SwiftError::Upstream(format!("object request returned {s}"))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    pub(crate) fn config(server: &MockServer) -> SwiftConfig {
        SwiftConfig {
            auth_url: format!("{}/auth/v1.0", server.uri()),
            username: "archive:reader".into(),
            password: "secret".into(),
            allowlist_path: "list.txt".into(),
            accept_invalid_certs: false,
        }
    }

    pub(crate) async fn mount_auth(server: &MockServer, token: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/auth/v1.0"))
            .and(header("X-Auth-User", "archive:reader"))
            .and(header("X-Auth-Key", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Auth-Token", token)
                    .insert_header("X-Storage-Url", format!("{}/v1/AUTH_sls", server.uri()).as_str()),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetch_reuses_session() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/AUTH_sls/a/b.jpg"))
            .and(header("X-Auth-Token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .expect(2)
            .mount(&server)
            .await;

        let client = SwiftClient::new(&config(&server)).unwrap();
        for _ in 0..2 {
            let resp = client.fetch("a/b.jpg").await.unwrap();
            assert_eq!(resp.bytes().await.unwrap().as_ref(), b"jpeg");
        }
    }

    #[tokio::test]
    async fn expired_token_triggers_one_reauth() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok", 2).await;
        Mock::given(method("GET"))
            .and(path("/v1/AUTH_sls/a.tif"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/AUTH_sls/a.tif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tif".to_vec()))
            .mount(&server)
            .await;

        let client = SwiftClient::new(&config(&server)).unwrap();
        let resp = client.fetch("a.tif").await.unwrap();
        assert_eq!(resp.bytes().await.unwrap().as_ref(), b"tif");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/AUTH_sls/gone.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = SwiftClient::new(&config(&server)).unwrap();
        assert!(matches!(client.fetch("gone.jpg").await, Err(SwiftError::NotFound)));
    }

    #[tokio::test]
    async fn auth_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1.0"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = SwiftClient::new(&config(&server)).unwrap();
        assert!(matches!(client.fetch("a.jpg").await, Err(SwiftError::Auth(_))));
    }

    #[tokio::test]
    async fn server_errors_are_upstream() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok", 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/AUTH_sls/a.jpg"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SwiftClient::new(&config(&server)).unwrap();
        assert!(matches!(client.fetch("a.jpg").await, Err(SwiftError::Upstream(_))));
    }
}
