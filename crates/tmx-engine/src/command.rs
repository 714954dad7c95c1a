//! Inputs of the facade's mutating verbs.
//!
//! `expected_version` is the version the caller rendered. When present and
//! stale, the call fails with `Conflict` before any validation.

use serde::{Deserialize, Serialize};

use tmx_access::{ParticipantRole, PermissionSet};
use tmx_core::UserId;
use tmx_state::{DocumentEdit, DocumentTransition, StageId, TransactionAction, TransactionSide};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub side: TransactionSide,
    pub client_id: UserId,
    /// Required for admins; brokers always open for themselves.
    #[serde(default)]
    pub broker_id: Option<UserId>,
    pub property_address: String,
    #[serde(default)]
    pub initial_stage: Option<StageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTransaction {
    #[serde(flatten)]
    pub action: TransactionAction,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTransaction {
    pub property_address: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDocument {
    #[serde(flatten)]
    pub transition: DocumentTransition,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDocument {
    #[serde(flatten)]
    pub edit: DocumentEdit,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddParticipant {
    pub user_id: UserId,
    pub role: ParticipantRole,
    /// `None` gives the role defaults.
    #[serde(default)]
    pub grants: Option<PermissionSet>,
    /// Version of the participant list.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGrants {
    /// `None` resets to the role defaults.
    #[serde(default)]
    pub grants: Option<PermissionSet>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmx_state::UploadCompletion;

    #[test]
    fn test_transition_document_flattens_action() {
        let cmd: TransitionDocument = serde_json::from_str(
            r#"{"action":"ATTACH_FILE","upload":{"outcome":"CANCELLED"},"expected_version":4}"#,
        )
        .unwrap();
        assert_eq!(cmd.expected_version, Some(4));
        assert_eq!(
            cmd.transition,
            DocumentTransition::AttachFile {
                upload: UploadCompletion::Cancelled
            }
        );
    }

    #[test]
    fn test_transition_transaction_without_version() {
        let cmd: TransitionTransaction =
            serde_json::from_str(r#"{"action":"ADVANCE_STAGE"}"#).unwrap();
        assert_eq!(cmd.action, TransactionAction::AdvanceStage);
        assert_eq!(cmd.expected_version, None);
    }
}
