//! Error and success envelopes.
//!
//! Success: `{ "success": true, "data": .., "message": .. }`.
//! Failure: `{ "success": false, "message": .., "errors": [..] }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use evax_auth::AuthzError;
use evax_core::DomainError;
use evax_infra::ServiceError;

pub type ApiResult<T = Response> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, errors: Vec<String> },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The request body could not be read or decoded.
    #[error("{1}")]
    Rejected(StatusCode, String),

    /// Logged in full; the client sees a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Presence failure naming every missing field.
    pub fn missing_fields(fields: Vec<String>) -> Self {
        Self::Validation {
            message: format!("missing required fields: {}", fields.join(", ")),
            errors: fields,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Rejected(status, _) => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::validation(msg),
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::Conflict(msg) => Self::Conflict(msg),
            ServiceError::Unauthorized(msg) => Self::Unauthorized(msg),
            ServiceError::Concurrency(detail) => {
                tracing::warn!(%detail, "stale write rejected");
                Self::Conflict("the record was modified concurrently, please retry".into())
            }
            other @ (ServiceError::Store(_)
            | ServiceError::Token(_)
            | ServiceError::Credential(_)) => Self::Internal(other.to_string()),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        Self::Forbidden(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            Self::Validation { message, errors } => (message, errors),
            Self::Internal(detail) => {
                error!(%detail, "request failed");
                ("Internal server error".to_string(), Vec::new())
            }
            other => (other.to_string(), Vec::new()),
        };

        (
            status,
            Json(json!({
                "success": false,
                "message": message,
                "errors": errors,
            })),
        )
            .into_response()
    }
}

pub fn json_ok<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    (
        status,
        Json(json!({
            "success": true,
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}

pub fn ok<T: Serialize>(message: &str, data: T) -> ApiResult {
    Ok(json_ok(StatusCode::OK, message, data))
}

pub fn created<T: Serialize>(message: &str, data: T) -> ApiResult {
    Ok(json_ok(StatusCode::CREATED, message, data))
}
