//! HS256 session tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::{Role, SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature, encoding or algorithm check failed.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// Mints session tokens for authenticated accounts.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, sub: Uuid, role: Role, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// Shared-secret HS256 tokens.
#[derive(Clone)]
pub struct Hs256Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Tokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn validation() -> Validation {
        // Time checks run in `validate_claims` against the caller's `now`.
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = false;
        v.validate_nbf = false;
        v.validate_aud = false;
        v.required_spec_claims.clear();
        v
    }
}

impl JwtValidator for Hs256Tokens {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                TokenError::Invalid(e.to_string())
            })?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl TokenIssuer for Hs256Tokens {
    fn issue(&self, sub: Uuid, role: Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = SessionClaims::new(sub, role, now, self.ttl)
            .ok_or_else(|| TokenError::Issue("token expiry is out of range".into()))?;
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }
}
