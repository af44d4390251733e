//! Service-level error model (what the engine and registry return).

use thiserror::Error;

use evax_auth::{CredentialError, TokenError};
use evax_core::DomainError;

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A write lost an optimistic revision check.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    #[error("store failure: {0}")]
    Store(String),

    #[error("token failure: {0}")]
    Token(String),

    #[error("credential failure: {0}")]
    Credential(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound(msg) => Self::NotFound(msg),
            DomainError::Conflict(msg) | DomainError::InvariantViolation(msg) => Self::Conflict(msg),
            DomainError::Unauthorized(msg) => Self::Unauthorized(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Concurrency(msg) => Self::Concurrency(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        Self::Token(err.to_string())
    }
}

impl From<CredentialError> for ServiceError {
    fn from(err: CredentialError) -> Self {
        Self::Credential(err.to_string())
    }
}
