//! # Lifecycle Errors
//!
//! Shared error type for transaction and document-request transitions.
//! State machine errors carry the current state and the attempted
//! transition; validation errors carry the offending field.

use thiserror::Error;

use tmx_core::{Field, FieldError};

use crate::stage::StageResolutionError;

/// Errors raised by lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The attempted transition is not valid from the current state.
    #[error("invalid transition: {attempted} is not allowed from {from}")]
    InvalidTransition {
        /// The current state name.
        from: String,
        /// The attempted transition name.
        attempted: String,
    },

    /// The transition is allowed from this state but its input is invalid.
    #[error("validation failed: {0}")]
    Validation(#[from] FieldError),

    /// The stored current stage could not be resolved.
    #[error(transparent)]
    StageResolution(#[from] StageResolutionError),
}

impl LifecycleError {
    pub(crate) fn invalid(from: impl ToString, attempted: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            attempted: attempted.to_string(),
        }
    }

    pub(crate) fn field(field: Field, reason: impl Into<String>) -> Self {
        Self::Validation(FieldError::new(field, reason))
    }
}
