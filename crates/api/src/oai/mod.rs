//! OAI-PMH 2.0 metadata harvesting endpoint.
//!
//! Items (digital objects) are disseminated as `oai_dc` or `europeana`,
//! collections as `ead`. Errors are OAI error documents, never JSON.

pub mod error;
pub mod handler;
pub mod query;
pub mod render;
pub mod request;
pub mod store;
pub mod xml;

use std::sync::Arc;

use axum::{routing::get, Router};

pub use error::OaiError;
pub use render::Repository;
pub use store::{MetadataStore, SqlMetadataStore};

/// State shared by the OAI handlers.
#[derive(Clone)]
pub struct OaiState {
    pub store: Arc<dyn MetadataStore>,
    pub repository: Arc<Repository>,
    /// Scheme used for `baseURL` when no `X-Forwarded-Proto` header is sent.
    pub scheme: &'static str,
}

impl OaiState {
    pub fn new(store: Arc<dyn MetadataStore>, repository: Repository, tls: bool) -> Self {
        Self {
            store,
            repository: Arc::new(repository),
            scheme: if tls { "https" } else { "http" },
        }
    }
}

/// Routes for `/oai` and `/oai/`.
pub fn router(state: OaiState) -> Router {
    Router::new()
        .route("/oai", get(handler::handle))
        .route("/oai/", get(handler::handle))
        .with_state(state)
}
