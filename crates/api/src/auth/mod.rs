//! Account registration, login, token refresh and identity under `/auth`.
//!
//! Responses are `{"msg": ...}` bodies, with tokens added on success.

pub mod jwt;
pub mod password;
pub mod users;

use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::protocol::{Credentials, MessageResponse, TokenResponse};
use tracing::{error, info, warn};

pub use jwt::{Claims, Identity, TokenError, TokenIssuer, TokenKind};
pub use users::{SqlUserStore, User, UserStore};

#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenIssuer>,
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/identity", get(identity))
        .with_state(state)
}

fn reply(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(MessageResponse::new(msg))).into_response()
}

/// Parse a JSON object body. `None` for anything else, including `{}`.
fn credentials(body: &[u8]) -> Option<Credentials> {
    match serde_json::from_slice::<serde_json::Value>(body).ok()? {
        serde_json::Value::Object(map) if !map.is_empty() => Some(Credentials {
            email: map.get("email").and_then(|v| v.as_str()).map(str::to_owned),
            password: map.get("password").and_then(|v| v.as_str()).map(str::to_owned),
        }),
        _ => None,
    }
}

fn token_pair(tokens: &TokenIssuer, identity: &Identity, msg: String) -> Response {
    let pair = tokens
        .issue(identity, TokenKind::Access)
        .and_then(|access| Ok((access, tokens.issue(identity, TokenKind::Refresh)?)));
    match pair {
        Ok((access_token, refresh_token)) => Json(TokenResponse {
            msg,
            access_token,
            refresh_token: Some(refresh_token),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "token issue failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Could not issue tokens")
        }
    }
}

/// `POST /auth/register`
pub async fn register(State(state): State<AuthState>, body: Bytes) -> Response {
    let Some(creds) = credentials(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No JSON in payload.");
    };
    let (Some(email), Some(password)) = (
        creds.email.filter(|e| !e.is_empty()),
        creds.password.filter(|p| !p.is_empty()),
    ) else {
        return reply(StatusCode::BAD_REQUEST, "email or password not in JSON payload.");
    };

    match state.users.find_by_email(&email).await {
        Ok(Some(_)) => {
            return reply(StatusCode::BAD_REQUEST, format!("User '{email}' already exists."));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "user lookup failed during registration");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Error in user registration");
        }
    }

    let hashed = match tokio::task::spawn_blocking(move || password::hash(&password)).await {
        Ok(Ok(h)) => h,
        Ok(Err(e)) => {
            error!(error = %e, "password hashing failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Error in user registration");
        }
        Err(e) => {
            error!(error = %e, "password hashing task failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Error in user registration");
        }
    };

    let user = match state.users.create(&email, &hashed).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "user insert failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Error in user registration");
        }
    };
    info!(user = user.ident, "user registered");

    token_pair(
        &state.tokens,
        &user.identity(),
        format!(
            "User '{email}' was created. Contact support to be given editing rights for GDE projects."
        ),
    )
}

/// `POST /auth/login`
pub async fn login(State(state): State<AuthState>, body: Bytes) -> Response {
    const INCORRECT: &str = "Incorrect email or password.";

    let Some(creds) = credentials(&body) else {
        return reply(StatusCode::BAD_REQUEST, "No credentials provided.");
    };
    let (Some(email), Some(password)) = (creds.email, creds.password) else {
        return reply(StatusCode::BAD_REQUEST, INCORRECT);
    };

    let user = match state.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => return reply(StatusCode::BAD_REQUEST, INCORRECT),
        Err(e) => {
            error!(error = %e, "user lookup failed during login");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "Error during login");
        }
    };

    let stored = user.password.clone();
    let matches = tokio::task::spawn_blocking(move || password::verify(&password, &stored))
        .await
        .unwrap_or(false);
    if !matches {
        warn!(user = user.ident, "login with wrong password");
        return reply(StatusCode::BAD_REQUEST, INCORRECT);
    }

    info!(user = user.ident, "user logged in");
    token_pair(&state.tokens, &user.identity(), format!("Logged in as '{email}'"))
}

/// The raw token of an `Authorization: Bearer` header.
pub struct BearerToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| reply(StatusCode::UNAUTHORIZED, "Missing Authorization Header"))?;
        match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Self(token.trim().to_owned())),
            _ => Err(reply(
                StatusCode::UNAUTHORIZED,
                "Bad Authorization header. Expected value 'Bearer <JWT>'",
            )),
        }
    }
}

/// `POST /auth/refresh`: trade a refresh token for a new access token.
pub async fn refresh(State(state): State<AuthState>, BearerToken(token): BearerToken) -> Response {
    let claims = match state.tokens.verify(&token, TokenKind::Refresh) {
        Ok(c) => c,
        Err(e) => {
            info!(reason = %e, "refresh token rejected");
            return reply(StatusCode::UNAUTHORIZED, e.to_string());
        }
    };

    match state.tokens.issue(&claims.identity, TokenKind::Access) {
        Ok(access_token) => Json(TokenResponse {
            msg: format!("Logged in as '{}'", claims.identity.email),
            access_token,
            refresh_token: None,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "token issue failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Could not issue tokens")
        }
    }
}

/// Claims of a valid access token. Guards routes that need a logged-in user.
pub struct AccessClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AuthState> for AccessClaims {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        state
            .tokens
            .verify(&token, TokenKind::Access)
            .map(Self)
            .map_err(|e| {
                info!(reason = %e, "access token rejected");
                reply(StatusCode::UNAUTHORIZED, e.to_string())
            })
    }
}

/// `GET /auth/identity`: who the presented access token belongs to.
pub async fn identity(AccessClaims(claims): AccessClaims) -> Json<Identity> {
    Json(claims.identity)
}
