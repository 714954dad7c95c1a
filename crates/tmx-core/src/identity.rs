//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers used by the engine. Each
//! identifier is a distinct type.
//!
//! ## Validation
//!
//! UUID-based identifiers ([`TransactionId`], [`DocumentRequestId`]) are
//! valid by construction. String-based identifiers ([`UserId`], [`FileRef`])
//! validate their format at construction time and deserialize through the
//! same check.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

/// Unique identifier of a brokerage transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new random transaction identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a transaction identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_uuid(s).map(Self)
    }
}

/// Unique identifier of a document request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRequestId(Uuid);

impl DocumentRequestId {
    /// Create a new random document request identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a document request identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentRequestId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_uuid(s).map(Self)
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(s.trim()).map_err(|e| ValidationError::InvalidUuid {
        value: s.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// Identifier of a user as issued by the external identity provider.
///
/// Opaque to the engine. Must be 1-128 characters with no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Maximum accepted length in bytes.
    pub const MAX_LEN: usize = 128;

    /// Create a validated user id.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if s.is_empty() || s.len() > Self::MAX_LEN || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidUserId(s));
        }
        Ok(Self(s))
    }

    /// The user id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Reference to a file held in the external object store.
///
/// The engine never touches file bytes. A `FileRef` is only recorded once
/// an upload has completed; see `tmx_state::UploadCompletion`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileRef(String);

impl FileRef {
    /// Create a validated file reference (non-empty, no whitespace).
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidFileRef(s));
        }
        Ok(Self(s))
    }

    /// The object key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FileRef {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileRef> for String {
    fn from(r: FileRef) -> Self {
        r.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_ids_are_unique() {
        assert_ne!(TransactionId::new(), TransactionId::new());
    }

    #[test]
    fn transaction_id_parses_from_display() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn document_id_rejects_garbage() {
        let err = "not-a-uuid".parse::<DocumentRequestId>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUuid { .. }));
    }

    #[test]
    fn transaction_id_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = TransactionId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn user_id_validation() {
        assert!(UserId::new("broker-42").is_ok());
        assert!(UserId::new("auth0|5f1c").is_ok());
        assert!(UserId::new("").is_err());
        assert!(UserId::new("has space").is_err());
        assert!(UserId::new("x".repeat(UserId::MAX_LEN + 1)).is_err());
    }

    #[test]
    fn user_id_deserialization_is_validated() {
        let ok: UserId = serde_json::from_str("\"client-7\"").unwrap();
        assert_eq!(ok.as_str(), "client-7");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn file_ref_validation() {
        let r = FileRef::new("uploads/tx-1/offer.pdf").unwrap();
        assert_eq!(r.to_string(), "uploads/tx-1/offer.pdf");
        assert!(FileRef::new("").is_err());
        assert!(FileRef::new("two words.pdf").is_err());
    }
}
