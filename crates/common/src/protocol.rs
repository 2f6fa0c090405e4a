//! JSON request and response bodies of the public API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register` and `POST /auth/login`.
///
/// Both fields are optional at the type level so that a missing field can be
/// reported with the API's own message rather than a deserialisation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Successful response body for the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub msg: String,
    pub access_token: String,
    /// Absent on `POST /auth/refresh`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub refresh_token: Option<String>,
}

/// Plain `{"msg": ...}` body used by the auth endpoints for failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

// ---------------------------------------------------------------------------
// Digital editions
// ---------------------------------------------------------------------------

/// Response body for the `text/{est,com,inl}` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub id: String,
    pub content: String,
}

/// Response body for `/{project}/html/{filename}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlContent {
    pub filename: String,
    pub contents: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx JSON status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Names of the integrations mounted in this process.
    pub integrations: Vec<String>,
    /// Number of paths on the access-file allow-list.
    pub allowlist_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceError;

    #[test]
    fn credentials_tolerate_missing_fields() {
        let c: Credentials = serde_json::from_str(r#"{"email":"a@b.fi"}"#).unwrap();
        assert_eq!(c.email.as_deref(), Some("a@b.fi"));
        assert!(c.password.is_none());
    }

    #[test]
    fn refresh_response_omits_refresh_token() {
        let r = TokenResponse {
            msg: "Logged in as 'a@b.fi'".into(),
            access_token: "tok".into(),
            refresh_token: None,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("refresh_token").is_none());
        assert_eq!(json["access_token"], "tok");
    }

    #[test]
    fn error_response_from_service_error() {
        let e = ErrorResponse::from(&ServiceError::NotFound("no such file".into()));
        assert_eq!(e.code, "not_found");
        assert_eq!(e.message, "no such file");
    }
}
