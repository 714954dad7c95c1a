//! # Rejections
//!
//! The single error type returned by every facade operation. Each variant
//! has a fieldless [`RejectionKind`] so callers branch on structure, never
//! on message text. No rejection is fatal: every one is answered by
//! retrying with corrected input or fresh state.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tmx_access::AccessDenied;
use tmx_core::{Field, FieldError};
use tmx_state::{LifecycleError, StageResolutionError};

use crate::store::StoreError;

/// Why the facade refused an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No actor context accompanied a mutation.
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("permission denied: {0}")]
    PermissionDenied(#[from] AccessDenied),

    /// Not valid from the entity's current state.
    #[error("invalid transition: {attempted} is not allowed from {from}")]
    InvalidTransition { from: String, attempted: String },

    /// Input rejected; attributable to one field.
    #[error("validation failed: {0}")]
    Validation(#[from] FieldError),

    /// The stored current stage does not resolve.
    #[error("stage resolution failed: {0}")]
    StageResolution(#[from] StageResolutionError),

    /// The entity changed since the caller read it.
    #[error("conflict: expected version {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// Missing, or not visible to the actor.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

/// Structural discriminant of a [`Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    AuthenticationRequired,
    PermissionDenied,
    InvalidTransition,
    ValidationError,
    StageResolutionError,
    Conflict,
    NotFound,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::StageResolutionError => "STAGE_RESOLUTION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::AuthenticationRequired => RejectionKind::AuthenticationRequired,
            Self::PermissionDenied(_) => RejectionKind::PermissionDenied,
            Self::InvalidTransition { .. } => RejectionKind::InvalidTransition,
            Self::Validation(_) => RejectionKind::ValidationError,
            Self::StageResolution(_) => RejectionKind::StageResolutionError,
            Self::Conflict { .. } => RejectionKind::Conflict,
            Self::NotFound { .. } => RejectionKind::NotFound,
        }
    }

    /// The offending field of a validation rejection.
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::Validation(fe) => Some(fe.field),
            _ => None,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(from: impl ToString, attempted: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            attempted: attempted.to_string(),
        }
    }

    pub(crate) fn field_error(field: Field, reason: impl Into<String>) -> Self {
        Self::Validation(FieldError::new(field, reason))
    }
}

impl From<LifecycleError> for Rejection {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { from, attempted } => {
                Self::InvalidTransition { from, attempted }
            }
            LifecycleError::Validation(fe) => Self::Validation(fe),
            LifecycleError::StageResolution(e) => Self::StageResolution(e),
        }
    }
}

impl From<StoreError> for Rejection {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::VersionMismatch {
                expected, actual, ..
            } => Self::Conflict { expected, actual },
            StoreError::AlreadyExists { entity, id } => {
                tracing::warn!(entity, %id, "identifier collision on insert");
                Self::Conflict {
                    expected: 0,
                    actual: 1,
                }
            }
        }
    }
}
