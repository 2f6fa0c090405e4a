//! Per-integration state assembled at startup.

use crate::accessfiles::{AccessFilesState, AllowList};
use crate::auth::AuthState;
use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::editions::EditionsState;
use crate::filemaker::FileMakerState;
use crate::oai::OaiState;

/// Everything the router needs. An integration whose state is `None` has no
/// routes mounted.
#[derive(Clone)]
pub struct AppState {
    pub oai: Option<OaiState>,
    pub accessfiles: Option<AccessFilesState>,
    pub filemaker: Option<FileMakerState>,
    pub editions: Option<EditionsState>,
    pub auth: Option<AuthState>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AppState {
    /// No integrations and the default request timeout.
    fn default() -> Self {
        Self {
            oai: None,
            accessfiles: None,
            filemaker: None,
            editions: None,
            auth: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppState {
    /// Names of the mounted integrations, in route order.
    pub fn integrations(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.oai.is_some() {
            names.push("oai");
        }
        if self.accessfiles.is_some() {
            names.push("accessfiles");
        }
        if self.filemaker.is_some() {
            names.push("filemaker");
        }
        if let Some(editions) = &self.editions {
            names.push("digitaledition");
            if editions.has_semantic_data() {
                names.push("semantic_data");
            }
        }
        if self.auth.is_some() {
            names.push("auth");
        }
        names
    }

    pub fn allowlist(&self) -> Option<&AllowList> {
        self.accessfiles.as_ref().map(|a| &a.allowlist)
    }
}
