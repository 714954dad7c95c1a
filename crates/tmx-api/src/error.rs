//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine rejections to HTTP status codes and JSON error bodies with
//! a machine-readable code, a message, and structured details. Internal
//! error text is never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use tmx_access::DenialReason;
use tmx_core::{Field, ValidationError};
use tmx_engine::Rejection;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "FORBIDDEN", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Structured context: the offending field, the denial reason, or the
    /// version pair of a conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// No caller identity, or an invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The permission gate refused (403).
    #[error("{message}")]
    Forbidden {
        message: String,
        reason: Option<DenialReason>,
    },

    /// Missing or not visible to the caller (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Input rejected by validation (422).
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<Field>,
    },

    /// The stored current stage does not resolve (422).
    #[error("{0}")]
    StageResolution(String),

    /// Not valid from the entity's current state (409).
    #[error("{0}")]
    InvalidTransition(String),

    /// The entity changed since the caller read it (409).
    #[error("{message}")]
    Conflict {
        message: String,
        expected: u64,
        actual: u64,
    },

    /// Request could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500). Logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::StageResolution(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "STAGE_RESOLUTION_ERROR")
            }
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Forbidden {
                reason: Some(reason),
                ..
            } => Some(json!({ "reason": reason })),
            Self::Validation {
                field: Some(field), ..
            } => Some(json!({ "field": field })),
            Self::Conflict {
                expected, actual, ..
            } => Some(json!({ "expected_version": expected, "actual_version": actual })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        } else {
            tracing::warn!(code, status = status.as_u16(), %message, "request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            Rejection::AuthenticationRequired => Self::Unauthorized(message),
            Rejection::PermissionDenied(denied) => Self::Forbidden {
                message,
                reason: Some(denied.reason),
            },
            Rejection::NotFound { .. } => Self::NotFound(message),
            Rejection::Validation(fe) => Self::Validation {
                message,
                field: Some(fe.field),
            },
            Rejection::StageResolution(_) => Self::StageResolution(message),
            Rejection::InvalidTransition { .. } => Self::InvalidTransition(message),
            Rejection::Conflict { expected, actual } => Self::Conflict {
                message,
                expected,
                actual,
            },
        }
    }
}

/// Malformed identifiers in paths and tokens.
impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
