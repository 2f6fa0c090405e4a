//! HS256 access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Who a token was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    /// Projects the user may edit; `None` when they have no editing rights.
    pub projects: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub identity: Identity,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Only {} tokens are allowed", .0.as_str())]
    WrongKind(TokenKind),

    #[error("failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Sign a new token of `kind` for `identity`.
    ///
    /// # Errors
    ///
    /// [`TokenError::Sign`] if the claims cannot be encoded.
    pub fn issue(&self, identity: &Identity, kind: TokenKind) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            identity: identity.clone(),
            typ: kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Validate signature, expiry and kind, returning the claims.
    ///
    /// # Errors
    ///
    /// [`TokenError::Expired`], [`TokenError::Invalid`] or
    /// [`TokenError::WrongKind`].
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        if data.claims.typ != kind {
            return Err(TokenError::WrongKind(kind));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            email: "editor@sls.fi".into(),
            projects: Some(vec!["topelius".into(), "parland".into()]),
        }
    }

    #[test]
    fn issued_token_verifies_with_claims() {
        let issuer = TokenIssuer::new("secret", 3600, 7200);
        let token = issuer.issue(&identity(), TokenKind::Refresh).unwrap();
        let claims = issuer.verify(&token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.identity, identity());
        assert_eq!(claims.typ, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 7200);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn every_token_has_its_own_jti() {
        let issuer = TokenIssuer::new("secret", 3600, 7200);
        let a = issuer.issue(&identity(), TokenKind::Access).unwrap();
        let b = issuer.issue(&identity(), TokenKind::Access).unwrap();
        let a = issuer.verify(&a, TokenKind::Access).unwrap();
        let b = issuer.verify(&b, TokenKind::Access).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let issuer = TokenIssuer::new("secret", 3600, 7200);
        let token = issuer.issue(&identity(), TokenKind::Access).unwrap();
        let err = issuer.verify(&token, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, TokenError::WrongKind(TokenKind::Refresh)));
        assert_eq!(err.to_string(), "Only refresh tokens are allowed");
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = TokenIssuer::new("one", 3600, 7200)
            .issue(&identity(), TokenKind::Access)
            .unwrap();
        let err = TokenIssuer::new("two", 3600, 7200)
            .verify(&token, TokenKind::Access)
            .unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Past the default 60 s validation leeway.
        let issuer = TokenIssuer::new("secret", -300, 7200);
        let token = issuer.issue(&identity(), TokenKind::Access).unwrap();
        assert!(matches!(
            issuer.verify(&token, TokenKind::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let issuer = TokenIssuer::new("secret", 3600, 7200);
        assert!(matches!(
            issuer.verify("not.a.jwt", TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }
}
