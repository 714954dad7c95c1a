//! # Error Vocabulary
//!
//! Validation errors for identifier construction and the typed [`Field`]
//! names used by every field-level rejection in the workspace.
//!
//! ## Design
//!
//! A rejected form submission must be attributable to exactly one field
//! without reading the message. [`FieldError`] carries the field as an enum
//! and a human-readable reason that is for display only.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named input field that a validation failure can be attributed to.
///
/// Serialized as `SCREAMING_SNAKE_CASE` so that API consumers can key
/// error messages by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    /// Transaction side (buy or sell).
    Side,
    /// The client a transaction is opened for.
    ClientId,
    /// The broker owning a transaction.
    BrokerId,
    /// Street address of the property.
    PropertyAddress,
    /// A stage identifier or legacy stage ordinal.
    Stage,
    /// Requested initial status of a document request.
    Status,
    /// Document type code.
    DocType,
    /// Free-text title overriding the document type label.
    CustomTitle,
    /// Broker instructions attached to a document request.
    Instructions,
    /// Due date of a document request.
    DueDate,
    /// Attached or submitted file.
    File,
    /// Note explaining why a revision is requested.
    RevisionNote,
    /// Participant user id.
    UserId,
    /// Participant permission grants.
    Grants,
}

impl Field {
    /// The stable upper-case wire name of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Side => "SIDE",
            Self::ClientId => "CLIENT_ID",
            Self::BrokerId => "BROKER_ID",
            Self::PropertyAddress => "PROPERTY_ADDRESS",
            Self::Stage => "STAGE",
            Self::Status => "STATUS",
            Self::DocType => "DOC_TYPE",
            Self::CustomTitle => "CUSTOM_TITLE",
            Self::Instructions => "INSTRUCTIONS",
            Self::DueDate => "DUE_DATE",
            Self::File => "FILE",
            Self::RevisionNote => "REVISION_NOTE",
            Self::UserId => "USER_ID",
            Self::Grants => "GRANTS",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation failure attributed to a single input field.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{field}: {reason}")]
pub struct FieldError {
    /// The field that failed validation.
    pub field: Field,
    /// Human-readable explanation. Display only; never matched on.
    pub reason: String,
}

impl FieldError {
    /// Build a field error.
    pub fn new(field: Field, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validation errors for identifier newtypes.
///
/// Each string-backed identifier enforces its format at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// User id is empty or too long.
    #[error("invalid user id: \"{0}\" (expected 1-128 non-whitespace characters)")]
    InvalidUserId(String),

    /// File reference is empty or contains whitespace.
    #[error("invalid file reference: \"{0}\" (expected a non-empty object key)")]
    InvalidFileRef(String),

    /// Identifier string is not a UUID.
    #[error("invalid identifier: \"{value}\" ({reason})")]
    InvalidUuid {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// The field this validation error applies to, if it maps to one.
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::InvalidUserId(_) => Some(Field::UserId),
            Self::InvalidFileRef(_) => Some(Field::File),
            Self::InvalidUuid { .. } => None,
        }
    }
}
