//! # Permission Gate
//!
//! Decides whether an actor may perform an operation on a transaction.
//!
//! ## Resolution order
//!
//! 1. The actor context must be scoped to this transaction.
//! 2. ADMIN actors hold every permission.
//! 3. Otherwise the participant record for the actor decides. The owning
//!    broker and the represented client are participants even without a
//!    record, with their role defaults.
//! 4. Non-participants hold nothing.
//! 5. An archived transaction revokes every `EDIT_*` permission,
//!    whatever the role.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tmx_state::{DocumentRequest, DocumentStatus, Transaction};

use crate::participant::{ActorContext, Participant, ParticipantRole};
use crate::permission::{Permission, PermissionSet};

/// The role an actor resolved to on one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveRole {
    Admin,
    Broker,
    Client,
}

impl From<ParticipantRole> for EffectiveRole {
    fn from(role: ParticipantRole) -> Self {
        match role {
            ParticipantRole::Broker => Self::Broker,
            ParticipantRole::Client => Self::Client,
        }
    }
}

/// Why a permission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    /// The actor context is not scoped to this transaction.
    OutOfScope,
    /// The actor is not a participant.
    NotParticipant,
    /// The participant does not hold the permission.
    NotGranted,
    /// The transaction is archived and the permission is an edit.
    Archived,
    /// Only the client side may do this.
    NotClientSide,
    /// Only the creator of a draft may see or change it.
    NotDraftOwner,
    /// The platform role may not do this.
    RoleNotAllowed,
}

impl DenialReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::OutOfScope => "actor context is scoped to another transaction",
            Self::NotParticipant => "actor is not a participant of this transaction",
            Self::NotGranted => "permission not granted",
            Self::Archived => "transaction is archived",
            Self::NotClientSide => "only the client side may do this",
            Self::NotDraftOwner => "draft belongs to another broker",
            Self::RoleNotAllowed => "role may not do this",
        }
    }
}

/// A refused permission check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{permission} denied: {}", .reason.describe())]
pub struct AccessDenied {
    pub permission: Permission,
    pub reason: DenialReason,
}

impl AccessDenied {
    pub fn new(permission: Permission, reason: DenialReason) -> Self {
        Self { permission, reason }
    }
}

// ─── Gate ────────────────────────────────────────────────────────────

/// Permission checks against one transaction and its participants.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGate<'a> {
    transaction: &'a Transaction,
    participants: &'a [Participant],
}

impl<'a> PermissionGate<'a> {
    pub fn new(transaction: &'a Transaction, participants: &'a [Participant]) -> Self {
        Self {
            transaction,
            participants,
        }
    }

    /// The participant record of `actor`, if any.
    pub fn participant(&self, actor: &ActorContext) -> Option<&'a Participant> {
        self.participants
            .iter()
            .find(|p| p.transaction_id == self.transaction.id && p.user_id == actor.actor_id)
    }

    /// Role and permissions before the archive override.
    fn resolve(&self, actor: &ActorContext) -> Result<(EffectiveRole, PermissionSet), DenialReason> {
        if actor.transaction_id != Some(self.transaction.id) {
            return Err(DenialReason::OutOfScope);
        }
        if actor.is_admin() {
            return Ok((EffectiveRole::Admin, PermissionSet::all()));
        }
        if let Some(p) = self.participant(actor) {
            return Ok((p.role.into(), p.permissions()));
        }
        let implicit = if actor.actor_id == self.transaction.broker_id {
            ParticipantRole::Broker
        } else if actor.actor_id == self.transaction.client_id {
            ParticipantRole::Client
        } else {
            return Err(DenialReason::NotParticipant);
        };
        Ok((implicit.into(), implicit.default_permissions()))
    }

    /// Everything `actor` may currently do on the transaction.
    pub fn effective_permissions(&self, actor: &ActorContext) -> PermissionSet {
        match self.resolve(actor) {
            Ok((_, perms)) if self.transaction.archived => perms.without_edits(),
            Ok((_, perms)) => perms,
            Err(_) => PermissionSet::empty(),
        }
    }

    pub fn check(&self, actor: &ActorContext, permission: Permission) -> bool {
        self.authorize(actor, permission).is_ok()
    }

    /// Check `permission` and return the role the actor acted as.
    pub fn authorize(
        &self,
        actor: &ActorContext,
        permission: Permission,
    ) -> Result<EffectiveRole, AccessDenied> {
        let (role, perms) = self
            .resolve(actor)
            .map_err(|reason| AccessDenied::new(permission, reason))?;
        if !perms.contains(permission) {
            return Err(AccessDenied::new(permission, DenialReason::NotGranted));
        }
        if self.transaction.archived && permission.is_edit() {
            return Err(AccessDenied::new(permission, DenialReason::Archived));
        }
        Ok(role)
    }

    /// Restoring an archived transaction needs `EDIT_TRANSACTION` as it
    /// would be held without the archive.
    pub fn authorize_unarchive(&self, actor: &ActorContext) -> Result<EffectiveRole, AccessDenied> {
        let permission = Permission::EditTransaction;
        let (role, perms) = self
            .resolve(actor)
            .map_err(|reason| AccessDenied::new(permission, reason))?;
        if !perms.contains(permission) {
            return Err(AccessDenied::new(permission, DenialReason::NotGranted));
        }
        Ok(role)
    }

    /// `permission` plus the requirement that the actor is on the client side.
    pub fn authorize_client_side(
        &self,
        actor: &ActorContext,
        permission: Permission,
    ) -> Result<(), AccessDenied> {
        match self.authorize(actor, permission)? {
            EffectiveRole::Client => Ok(()),
            _ => Err(AccessDenied::new(permission, DenialReason::NotClientSide)),
        }
    }

    /// `ADMIN` actors only. The archive override does not apply.
    pub fn authorize_admin(
        &self,
        actor: &ActorContext,
        permission: Permission,
    ) -> Result<(), AccessDenied> {
        match self.resolve(actor) {
            Ok((EffectiveRole::Admin, _)) => Ok(()),
            Ok(_) => Err(AccessDenied::new(permission, DenialReason::RoleNotAllowed)),
            Err(reason) => Err(AccessDenied::new(permission, reason)),
        }
    }
}

/// Whether `actor` holds `permission` on `transaction`.
pub fn check_permission(
    transaction: &Transaction,
    participants: &[Participant],
    actor: &ActorContext,
    permission: Permission,
) -> bool {
    PermissionGate::new(transaction, participants).check(actor, permission)
}

/// Drafts can only be seen or changed by the broker who created them.
pub fn require_draft_owner(
    document: &DocumentRequest,
    actor: &ActorContext,
    permission: Permission,
) -> Result<(), AccessDenied> {
    if document.status == DocumentStatus::Draft && !document.is_draft_owner(&actor.actor_id) {
        return Err(AccessDenied::new(permission, DenialReason::NotDraftOwner));
    }
    Ok(())
}

/// Opening a transaction is reserved to brokers and admins.
pub fn authorize_open(actor: &ActorContext) -> Result<(), AccessDenied> {
    if actor.role.can_open_transactions() {
        Ok(())
    } else {
        Err(AccessDenied::new(
            Permission::EditTransaction,
            DenialReason::RoleNotAllowed,
        ))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ActorRole;
    use tmx_core::{DocumentRequestId, TransactionId, UserId};
    use tmx_state::{NewDocumentRequest, NewTransaction, StageId, TransactionSide};

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn transaction() -> Transaction {
        Transaction::open(
            TransactionId::new(),
            NewTransaction {
                side: TransactionSide::BuySide,
                client_id: user("client-1"),
                broker_id: user("broker-1"),
                property_address: "1 Main St".into(),
                initial_stage: None,
            },
        )
        .unwrap()
    }

    fn actor(tx: &Transaction, id: &str, role: ActorRole) -> ActorContext {
        ActorContext::new(user(id), role).for_transaction(tx.id)
    }

    #[test]
    fn test_owning_broker_without_record() {
        let tx = transaction();
        let gate = PermissionGate::new(&tx, &[]);
        let broker = actor(&tx, "broker-1", ActorRole::Broker);
        assert_eq!(
            gate.authorize(&broker, Permission::EditDocuments),
            Ok(EffectiveRole::Broker)
        );
        assert!(!gate.check(&broker, Permission::SubmitDocuments));
    }

    #[test]
    fn test_admin_holds_everything() {
        let tx = transaction();
        let gate = PermissionGate::new(&tx, &[]);
        let admin = actor(&tx, "admin-1", ActorRole::Admin);
        assert_eq!(gate.effective_permissions(&admin), PermissionSet::all());
    }

    #[test]
    fn test_non_participant_holds_nothing() {
        let tx = transaction();
        let gate = PermissionGate::new(&tx, &[]);
        let stranger = actor(&tx, "broker-9", ActorRole::Broker);
        assert!(gate.effective_permissions(&stranger).is_empty());
        assert_eq!(
            gate.authorize(&stranger, Permission::ViewTransaction),
            Err(AccessDenied::new(
                Permission::ViewTransaction,
                DenialReason::NotParticipant
            ))
        );
    }

    #[test]
    fn test_context_scoped_to_other_transaction() {
        let tx = transaction();
        let other = transaction();
        let gate = PermissionGate::new(&tx, &[]);
        let admin = actor(&other, "admin-1", ActorRole::Admin);
        let err = gate.authorize(&admin, Permission::ViewTransaction).unwrap_err();
        assert_eq!(err.reason, DenialReason::OutOfScope);

        let unscoped = ActorContext::new(user("broker-1"), ActorRole::Broker);
        assert!(!gate.check(&unscoped, Permission::ViewTransaction));
    }

    #[test]
    fn test_read_only_co_client() {
        let tx = transaction();
        let participants = vec![Participant::new(tx.id, user("client-2"), ParticipantRole::Client)
            .with_grants(PermissionSet::from([
                Permission::ViewTransaction,
                Permission::ViewDocuments,
            ]))];
        let gate = PermissionGate::new(&tx, &participants);
        let co_client = actor(&tx, "client-2", ActorRole::Client);
        assert!(gate.check(&co_client, Permission::ViewDocuments));
        assert!(!gate.check(&co_client, Permission::SubmitDocuments));
    }

    #[test]
    fn test_record_overrides_implicit_role() {
        let tx = transaction();
        let participants = vec![Participant::new(tx.id, user("client-1"), ParticipantRole::Client)
            .with_grants(PermissionSet::from([Permission::ViewTransaction]))];
        let gate = PermissionGate::new(&tx, &participants);
        let client = actor(&tx, "client-1", ActorRole::Client);
        assert!(!gate.check(&client, Permission::ViewDocuments));
    }

    #[test]
    fn test_archived_revokes_edits_for_owning_broker() {
        let mut tx = transaction();
        tx.archived = true;
        let broker = actor(&tx, "broker-1", ActorRole::Broker);
        assert!(!check_permission(&tx, &[], &broker, Permission::EditDocuments));
        assert!(check_permission(&tx, &[], &broker, Permission::ViewDocuments));

        let gate = PermissionGate::new(&tx, &[]);
        assert_eq!(
            gate.authorize(&broker, Permission::EditStage).unwrap_err().reason,
            DenialReason::Archived
        );
        assert_eq!(gate.authorize_unarchive(&broker), Ok(EffectiveRole::Broker));

        let admin = actor(&tx, "admin-1", ActorRole::Admin);
        assert!(!gate.check(&admin, Permission::EditTransaction));
    }

    #[test]
    fn test_admin_only_ignores_archive() {
        let mut tx = transaction();
        tx.archived = true;
        let gate = PermissionGate::new(&tx, &[]);
        let admin = actor(&tx, "admin-1", ActorRole::Admin);
        let broker = actor(&tx, "broker-1", ActorRole::Broker);
        assert!(gate.authorize_admin(&admin, Permission::EditTransaction).is_ok());
        assert_eq!(
            gate.authorize_admin(&broker, Permission::EditTransaction)
                .unwrap_err()
                .reason,
            DenialReason::RoleNotAllowed
        );
    }

    #[test]
    fn test_client_cannot_unarchive() {
        let mut tx = transaction();
        tx.archived = true;
        let gate = PermissionGate::new(&tx, &[]);
        let client = actor(&tx, "client-1", ActorRole::Client);
        assert!(gate.authorize_unarchive(&client).is_err());
    }

    #[test]
    fn test_submit_is_client_side_only() {
        let tx = transaction();
        let gate = PermissionGate::new(&tx, &[]);
        let client = actor(&tx, "client-1", ActorRole::Client);
        assert!(gate
            .authorize_client_side(&client, Permission::SubmitDocuments)
            .is_ok());

        let admin = actor(&tx, "admin-1", ActorRole::Admin);
        assert_eq!(
            gate.authorize_client_side(&admin, Permission::SubmitDocuments)
                .unwrap_err()
                .reason,
            DenialReason::NotClientSide
        );
        let broker = actor(&tx, "broker-1", ActorRole::Broker);
        assert_eq!(
            gate.authorize_client_side(&broker, Permission::SubmitDocuments)
                .unwrap_err()
                .reason,
            DenialReason::NotGranted
        );
    }

    #[test]
    fn test_draft_owner() {
        let tx = transaction();
        let doc = DocumentRequest::create(
            DocumentRequestId::new(),
            tx.id,
            tx.side,
            NewDocumentRequest {
                doc_type: "ID_CARD".into(),
                custom_title: None,
                stage: StageId::BuyerPrequalifyFinancially,
                requires_signature: false,
                initial_status: DocumentStatus::Draft,
                file_ref: None,
                instructions: None,
                due_date: None,
            },
            user("broker-1"),
        )
        .unwrap();
        let owner = actor(&tx, "broker-1", ActorRole::Broker);
        let admin = actor(&tx, "admin-1", ActorRole::Admin);
        assert!(require_draft_owner(&doc, &owner, Permission::EditDocuments).is_ok());
        assert_eq!(
            require_draft_owner(&doc, &admin, Permission::EditDocuments)
                .unwrap_err()
                .reason,
            DenialReason::NotDraftOwner
        );
    }

    #[test]
    fn test_authorize_open() {
        assert!(authorize_open(&ActorContext::new(user("b"), ActorRole::Broker)).is_ok());
        assert!(authorize_open(&ActorContext::new(user("c"), ActorRole::Client)).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::participant::ActorRole;
    use proptest::prelude::*;
    use tmx_core::{TransactionId, UserId};
    use tmx_state::{NewTransaction, TransactionSide};

    fn permission_set() -> impl Strategy<Value = PermissionSet> {
        proptest::sample::subsequence(Permission::ALL.to_vec(), 0..=Permission::ALL.len())
            .prop_map(|v| v.into_iter().collect())
    }

    fn transaction(archived: bool) -> Transaction {
        let mut tx = Transaction::open(
            TransactionId::new(),
            NewTransaction {
                side: TransactionSide::SellSide,
                client_id: UserId::new("client-1").unwrap(),
                broker_id: UserId::new("broker-1").unwrap(),
                property_address: "1 Main St".into(),
                initial_stage: None,
            },
        )
        .unwrap();
        tx.archived = archived;
        tx
    }

    proptest! {
        /// Granted permissions never exceed the role ceiling.
        #[test]
        fn grants_never_exceed_ceiling(grants in permission_set(), broker in any::<bool>()) {
            let role = if broker { ParticipantRole::Broker } else { ParticipantRole::Client };
            let tx = transaction(false);
            let participants = vec![
                Participant::new(tx.id, UserId::new("helper").unwrap(), role).with_grants(grants),
            ];
            let actor = ActorContext::new(UserId::new("helper").unwrap(), ActorRole::Broker)
                .for_transaction(tx.id);
            let perms = PermissionGate::new(&tx, &participants).effective_permissions(&actor);
            prop_assert!(perms.is_subset(&role.ceiling()));
        }

        /// Archived transactions grant no edits to anyone.
        #[test]
        fn archived_grants_no_edits(grants in permission_set(), admin in any::<bool>()) {
            let tx = transaction(true);
            let participants = vec![
                Participant::new(tx.id, UserId::new("broker-1").unwrap(), ParticipantRole::Broker)
                    .with_grants(grants),
            ];
            let role = if admin { ActorRole::Admin } else { ActorRole::Broker };
            let actor = ActorContext::new(UserId::new("broker-1").unwrap(), role)
                .for_transaction(tx.id);
            let gate = PermissionGate::new(&tx, &participants);
            for p in Permission::ALL.iter().filter(|p| p.is_edit()) {
                prop_assert!(!gate.check(&actor, *p));
            }
        }
    }
}
