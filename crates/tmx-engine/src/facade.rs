//! # Transaction Mutation Facade
//!
//! The one seam through which every caller reads and changes transactions,
//! document requests and participants.
//!
//! ## Mutation pipeline
//!
//! ```text
//! authenticate ─▶ load ─▶ permission gate ─▶ expected_version ─▶ lifecycle ─▶ compare-and-swap ─▶ notify
//! ```
//!
//! The order is fixed: a request that is both unauthorized and invalid is
//! reported as unauthorized, and nothing is written unless every step
//! before the write passed. The write is a compare-and-swap on the version
//! read in the load step, so two racing mutations of one record cannot both
//! commit; the loser receives `Conflict` and retries on fresh state.
//!
//! The write is also conditional on the transaction and participant-list
//! versions the gate saw ([`ReadSet`]). An archive or grant change that
//! commits after the check makes the write a `Conflict`, and the retry is
//! judged by the new permissions.
//!
//! All operations are synchronous and hold no lock between steps.

use std::sync::Arc;

use tmx_access::{
    authorize_open, require_draft_owner, ActorContext, ActorRole, Participant, ParticipantRole,
    Permission, PermissionGate, PermissionSet,
};
use tmx_core::{DocumentRequestId, Field, TransactionId, UserId};
use tmx_state::{
    stages_for_side, DocumentRequest, DocumentTransition, NewDocumentRequest, NewTransaction,
    ResolvedStage, StageId, Transaction, TransactionAction, TransactionSide,
};

use crate::command::{
    AddParticipant, CreateTransaction, EditDocument, EditTransaction, TransitionDocument,
    TransitionTransaction, UpdateGrants,
};
use crate::error::Rejection;
use crate::events::{EngineEvent, NotificationSink, TracingNotifier};
use crate::repository::{InMemoryRepository, ReadSet, Repository};
use crate::store::Versioned;

/// Result of every facade operation.
pub type EngineResult<T> = Result<T, Rejection>;

/// A transaction with its participant list, as loaded for one call.
struct Loaded {
    transaction: Versioned<Transaction>,
    participants: Versioned<Vec<Participant>>,
}

impl Loaded {
    fn gate(&self) -> PermissionGate<'_> {
        PermissionGate::new(&self.transaction.record, &self.participants.record)
    }

    /// The versions every write of this call is conditional on.
    fn read_set(&self) -> ReadSet {
        ReadSet::of(&self.transaction, &self.participants)
    }
}

/// The mutation and query surface of the engine.
#[derive(Clone)]
pub struct TransactionMutationFacade {
    repository: Arc<dyn Repository>,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for TransactionMutationFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionMutationFacade").finish_non_exhaustive()
    }
}

impl Default for TransactionMutationFacade {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TransactionMutationFacade {
    pub fn new(repository: Arc<dyn Repository>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// In-memory storage with log-only notifications.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()), Arc::new(TracingNotifier))
    }

    // ─── Transactions ────────────────────────────────────────────────

    /// Open a transaction. The owning broker and the client become its
    /// first participants.
    pub fn create_transaction(
        &self,
        actor: Option<&ActorContext>,
        cmd: CreateTransaction,
    ) -> EngineResult<Versioned<Transaction>> {
        let actor = authenticate(actor)?;
        authorize_open(actor)?;

        let broker_id = match (actor.role, cmd.broker_id) {
            (ActorRole::Broker, None) => actor.actor_id.clone(),
            (ActorRole::Broker, Some(id)) if id == actor.actor_id => id,
            (ActorRole::Broker, Some(_)) => {
                return Err(Rejection::field_error(
                    Field::BrokerId,
                    "brokers open transactions for themselves",
                ))
            }
            (_, Some(id)) => id,
            (_, None) => {
                return Err(Rejection::field_error(
                    Field::BrokerId,
                    "an owning broker is required",
                ))
            }
        };

        let transaction = Transaction::open(
            TransactionId::new(),
            NewTransaction {
                side: cmd.side,
                client_id: cmd.client_id,
                broker_id,
                property_address: cmd.property_address,
                initial_stage: cmd.initial_stage,
            },
        )?;
        let members = vec![
            Participant::new(
                transaction.id,
                transaction.broker_id.clone(),
                ParticipantRole::Broker,
            ),
            Participant::new(
                transaction.id,
                transaction.client_id.clone(),
                ParticipantRole::Client,
            ),
        ];
        let stored = self.repository.insert_transaction(transaction, members)?;

        tracing::info!(
            transaction_id = %stored.record.id,
            side = %stored.record.side,
            actor = %actor.actor_id,
            "transaction created"
        );
        self.notifier.notify(&EngineEvent::TransactionCreated {
            transaction_id: stored.record.id,
            actor: actor.actor_id.clone(),
        });
        Ok(stored)
    }

    /// Apply a stage or status action.
    pub fn transition_transaction(
        &self,
        actor: Option<&ActorContext>,
        id: TransactionId,
        cmd: TransitionTransaction,
    ) -> EngineResult<Versioned<Transaction>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&id)?;
        let gate = loaded.gate();
        match &cmd.action {
            TransactionAction::Unarchive => {
                gate.authorize_unarchive(actor)?;
            }
            action if action.is_stage_change() => {
                gate.authorize(actor, Permission::EditStage)?;
            }
            _ => {
                gate.authorize(actor, Permission::EditTransaction)?;
            }
        }
        let current = &loaded.transaction;
        check_precondition(cmd.expected_version, current.version)?;

        let mut next = current.record.clone();
        next.apply(&cmd.action, &actor.actor_id)?;
        let stored = self.repository.swap_transaction(&loaded.read_set(), next)?;

        tracing::info!(
            transaction_id = %id,
            action = %cmd.action,
            stage = %stored.record.current_stage,
            status = %stored.record.status,
            version = stored.version,
            "transaction transitioned"
        );
        self.notifier.notify(&EngineEvent::TransactionTransitioned {
            transaction_id: id,
            actor: actor.actor_id.clone(),
            action: cmd.action.as_str().to_string(),
            stage: stored.record.current_stage.clone(),
            status: stored.record.status,
            archived: stored.record.archived,
        });
        Ok(stored)
    }

    /// Change the property address.
    pub fn edit_transaction(
        &self,
        actor: Option<&ActorContext>,
        id: TransactionId,
        cmd: EditTransaction,
    ) -> EngineResult<Versioned<Transaction>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&id)?;
        loaded.gate().authorize(actor, Permission::EditTransaction)?;
        let current = &loaded.transaction;
        check_precondition(cmd.expected_version, current.version)?;

        let mut next = current.record.clone();
        next.set_property_address(&cmd.property_address)?;
        let stored = self.repository.swap_transaction(&loaded.read_set(), next)?;

        tracing::info!(transaction_id = %id, version = stored.version, "transaction edited");
        self.notifier.notify(&EngineEvent::TransactionEdited {
            transaction_id: id,
            actor: actor.actor_id.clone(),
        });
        Ok(stored)
    }

    /// Remove an archived transaction with its documents and participants.
    /// Admins only.
    pub fn delete_transaction(
        &self,
        actor: Option<&ActorContext>,
        id: TransactionId,
        expected_version: Option<u64>,
    ) -> EngineResult<()> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&id)?;
        loaded.gate().authorize_admin(actor, Permission::EditTransaction)?;
        let current = &loaded.transaction;
        check_precondition(expected_version, current.version)?;
        if !current.record.archived {
            return Err(Rejection::invalid("NOT_ARCHIVED", "DELETE"));
        }
        self.repository.delete_transaction(&loaded.read_set())?;

        tracing::info!(transaction_id = %id, actor = %actor.actor_id, "transaction deleted");
        self.notifier.notify(&EngineEvent::TransactionDeleted {
            transaction_id: id,
            actor: actor.actor_id.clone(),
        });
        Ok(())
    }

    // ─── Document requests ───────────────────────────────────────────

    pub fn create_document(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        new: NewDocumentRequest,
    ) -> EngineResult<Versioned<DocumentRequest>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        loaded.gate().authorize(actor, Permission::EditDocuments)?;
        let tx = &loaded.transaction.record;

        let document = DocumentRequest::create(
            DocumentRequestId::new(),
            tx.id,
            tx.side,
            new,
            actor.actor_id.clone(),
        )?;
        let stored = self
            .repository
            .insert_document(&loaded.read_set(), document)?;

        tracing::info!(
            transaction_id = %transaction_id,
            document_id = %stored.record.id,
            status = %stored.record.status,
            "document request created"
        );
        self.notifier.notify(&EngineEvent::DocumentCreated {
            transaction_id,
            document_id: stored.record.id,
            actor: actor.actor_id.clone(),
            status: stored.record.status,
        });
        Ok(stored)
    }

    pub fn transition_document(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
        cmd: TransitionDocument,
    ) -> EngineResult<Versioned<DocumentRequest>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        let current = self.load_document(&transaction_id, &document_id)?;
        let gate = loaded.gate();
        let permission = match &cmd.transition {
            DocumentTransition::Submit { .. } => {
                gate.authorize_client_side(actor, Permission::SubmitDocuments)?;
                Permission::SubmitDocuments
            }
            DocumentTransition::Approve { .. } | DocumentTransition::RequestRevision { .. } => {
                gate.authorize(actor, Permission::ReviewDocuments)?;
                Permission::ReviewDocuments
            }
            DocumentTransition::AttachFile { .. }
            | DocumentTransition::SendRequest
            | DocumentTransition::Share => {
                gate.authorize(actor, Permission::EditDocuments)?;
                Permission::EditDocuments
            }
        };
        require_draft_owner(&current.record, actor, permission)?;
        check_precondition(cmd.expected_version, current.version)?;

        let kind = cmd.transition.kind();
        let from = current.record.status;
        let mut next = current.record.clone();
        let to = next.apply(cmd.transition, &actor.actor_id)?;
        let stored = self
            .repository
            .swap_document(&loaded.read_set(), current.version, next)?;

        tracing::info!(
            transaction_id = %transaction_id,
            document_id = %document_id,
            kind = %kind,
            from = %from,
            to = %to,
            version = stored.version,
            "document request transitioned"
        );
        self.notifier.notify(&EngineEvent::DocumentTransitioned {
            transaction_id,
            document_id,
            actor: actor.actor_id.clone(),
            kind,
            from,
            to,
        });
        Ok(stored)
    }

    pub fn edit_document(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
        cmd: EditDocument,
    ) -> EngineResult<Versioned<DocumentRequest>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        let current = self.load_document(&transaction_id, &document_id)?;
        loaded.gate().authorize(actor, Permission::EditDocuments)?;
        require_draft_owner(&current.record, actor, Permission::EditDocuments)?;
        check_precondition(cmd.expected_version, current.version)?;

        let mut next = current.record.clone();
        next.edit(cmd.edit, loaded.transaction.record.side, &actor.actor_id)?;
        let stored = self
            .repository
            .swap_document(&loaded.read_set(), current.version, next)?;

        tracing::info!(
            transaction_id = %transaction_id,
            document_id = %document_id,
            version = stored.version,
            "document request edited"
        );
        self.notifier.notify(&EngineEvent::DocumentEdited {
            transaction_id,
            document_id,
            actor: actor.actor_id.clone(),
        });
        Ok(stored)
    }

    /// Remove a DRAFT request.
    pub fn delete_document(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
        expected_version: Option<u64>,
    ) -> EngineResult<()> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        let current = self.load_document(&transaction_id, &document_id)?;
        loaded.gate().authorize(actor, Permission::EditDocuments)?;
        require_draft_owner(&current.record, actor, Permission::EditDocuments)?;
        check_precondition(expected_version, current.version)?;
        current.record.ensure_deletable()?;
        self.repository
            .delete_document(&loaded.read_set(), &document_id, current.version)?;

        tracing::info!(
            transaction_id = %transaction_id,
            document_id = %document_id,
            "document request deleted"
        );
        self.notifier.notify(&EngineEvent::DocumentDeleted {
            transaction_id,
            document_id,
            actor: actor.actor_id.clone(),
        });
        Ok(())
    }

    // ─── Participants ────────────────────────────────────────────────

    pub fn add_participant(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        cmd: AddParticipant,
    ) -> EngineResult<Versioned<Vec<Participant>>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        loaded.gate().authorize(actor, Permission::ManageParticipants)?;
        let current = &loaded.participants;
        check_precondition(cmd.expected_version, current.version)?;
        if current.record.iter().any(|p| p.user_id == cmd.user_id) {
            return Err(Rejection::field_error(
                Field::UserId,
                format!("{} is already a participant", cmd.user_id),
            ));
        }

        let mut participant = Participant::new(transaction_id, cmd.user_id.clone(), cmd.role);
        participant.grants = cmd.grants;
        let mut next = current.record.clone();
        next.push(participant);
        let stored = self.repository.swap_participants(&loaded.read_set(), next)?;

        tracing::info!(
            transaction_id = %transaction_id,
            user_id = %cmd.user_id,
            role = %cmd.role,
            "participant added"
        );
        self.notifier.notify(&EngineEvent::ParticipantAdded {
            transaction_id,
            user_id: cmd.user_id,
            role: cmd.role,
            actor: actor.actor_id.clone(),
        });
        Ok(stored)
    }

    pub fn update_participant_grants(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        user_id: &UserId,
        cmd: UpdateGrants,
    ) -> EngineResult<Versioned<Vec<Participant>>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        loaded.gate().authorize(actor, Permission::ManageParticipants)?;
        let current = &loaded.participants;
        check_precondition(cmd.expected_version, current.version)?;

        let mut next = current.record.clone();
        let member = next
            .iter_mut()
            .find(|p| &p.user_id == user_id)
            .ok_or_else(|| Rejection::not_found("participant", user_id))?;
        member.grants = cmd.grants;
        let stored = self.repository.swap_participants(&loaded.read_set(), next)?;

        tracing::info!(transaction_id = %transaction_id, user_id = %user_id, "participant grants updated");
        self.notifier.notify(&EngineEvent::ParticipantUpdated {
            transaction_id,
            user_id: user_id.clone(),
            actor: actor.actor_id.clone(),
        });
        Ok(stored)
    }

    /// Remove a participant. The owning broker stays.
    pub fn remove_participant(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        user_id: &UserId,
        expected_version: Option<u64>,
    ) -> EngineResult<Versioned<Vec<Participant>>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        loaded.gate().authorize(actor, Permission::ManageParticipants)?;
        let current = &loaded.participants;
        check_precondition(expected_version, current.version)?;
        if user_id == &loaded.transaction.record.broker_id {
            return Err(Rejection::field_error(
                Field::UserId,
                "the owning broker cannot be removed",
            ));
        }

        let mut next = current.record.clone();
        let before = next.len();
        next.retain(|p| &p.user_id != user_id);
        if next.len() == before {
            return Err(Rejection::not_found("participant", user_id));
        }
        let stored = self.repository.swap_participants(&loaded.read_set(), next)?;

        tracing::info!(transaction_id = %transaction_id, user_id = %user_id, "participant removed");
        self.notifier.notify(&EngineEvent::ParticipantRemoved {
            transaction_id,
            user_id: user_id.clone(),
            actor: actor.actor_id.clone(),
        });
        Ok(stored)
    }

    // ─── Reads ───────────────────────────────────────────────────────

    /// The ordered stage sequence of a side. Public reference data.
    pub fn stage_catalog(&self, side: TransactionSide) -> &'static [StageId] {
        stages_for_side(side)
    }

    pub fn resolve_current_stage(
        &self,
        actor: Option<&ActorContext>,
        id: TransactionId,
    ) -> EngineResult<ResolvedStage> {
        let transaction = self.get_transaction(actor, id)?;
        Ok(transaction.record.resolved_stage()?)
    }

    pub fn get_transaction(
        &self,
        actor: Option<&ActorContext>,
        id: TransactionId,
    ) -> EngineResult<Versioned<Transaction>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&id)?;
        loaded.gate().authorize(actor, Permission::ViewTransaction)?;
        Ok(loaded.transaction)
    }

    /// A document request. Drafts of other users are reported missing.
    pub fn get_document(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
    ) -> EngineResult<Versioned<DocumentRequest>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        loaded.gate().authorize(actor, Permission::ViewDocuments)?;
        let document = self.load_document(&transaction_id, &document_id)?;
        if !document.record.is_visible_to(&actor.actor_id) {
            return Err(Rejection::not_found("document request", document_id));
        }
        Ok(document)
    }

    /// Document requests of a transaction visible to the actor, oldest first.
    pub fn list_documents(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
    ) -> EngineResult<Vec<Versioned<DocumentRequest>>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        loaded.gate().authorize(actor, Permission::ViewDocuments)?;
        Ok(self
            .repository
            .documents_for(&transaction_id)
            .into_iter()
            .filter(|d| d.record.is_visible_to(&actor.actor_id))
            .collect())
    }

    pub fn list_participants(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
    ) -> EngineResult<Versioned<Vec<Participant>>> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        loaded.gate().authorize(actor, Permission::ViewTransaction)?;
        Ok(loaded.participants)
    }

    /// Whether the actor currently holds `permission`.
    pub fn check_permission(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
        permission: Permission,
    ) -> EngineResult<bool> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        Ok(loaded.gate().check(actor, permission))
    }

    /// Everything the actor currently holds.
    pub fn effective_permissions(
        &self,
        actor: Option<&ActorContext>,
        transaction_id: TransactionId,
    ) -> EngineResult<PermissionSet> {
        let actor = authenticate(actor)?;
        let loaded = self.load(&transaction_id)?;
        Ok(loaded.gate().effective_permissions(actor))
    }

    // ─── Loading ─────────────────────────────────────────────────────

    fn load(&self, id: &TransactionId) -> EngineResult<Loaded> {
        let transaction = self
            .repository
            .transaction(id)
            .ok_or_else(|| Rejection::not_found("transaction", id))?;
        let participants = self
            .repository
            .participants(id)
            .unwrap_or_else(|| Versioned::initial(Vec::new()));
        Ok(Loaded {
            transaction,
            participants,
        })
    }

    fn load_document(
        &self,
        transaction_id: &TransactionId,
        document_id: &DocumentRequestId,
    ) -> EngineResult<Versioned<DocumentRequest>> {
        self.repository
            .document(document_id)
            .filter(|d| &d.record.transaction_id == transaction_id)
            .ok_or_else(|| Rejection::not_found("document request", document_id))
    }
}

/// A missing actor context is never defaulted.
fn authenticate(actor: Option<&ActorContext>) -> EngineResult<&ActorContext> {
    actor.ok_or(Rejection::AuthenticationRequired)
}

fn check_precondition(expected: Option<u64>, actual: u64) -> EngineResult<()> {
    match expected {
        Some(expected) if expected != actual => Err(Rejection::Conflict { expected, actual }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionKind;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn open(facade: &TransactionMutationFacade) -> Versioned<Transaction> {
        let broker = ActorContext::new(user("broker-1"), ActorRole::Broker);
        facade
            .create_transaction(
                Some(&broker),
                CreateTransaction {
                    side: TransactionSide::BuySide,
                    client_id: user("client-1"),
                    broker_id: None,
                    property_address: "1 Main St".into(),
                    initial_stage: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_precondition() {
        assert!(check_precondition(None, 5).is_ok());
        assert!(check_precondition(Some(5), 5).is_ok());
        assert_eq!(
            check_precondition(Some(4), 5),
            Err(Rejection::Conflict { expected: 4, actual: 5 })
        );
    }

    #[test]
    fn test_create_seeds_participants() {
        let facade = TransactionMutationFacade::in_memory();
        let tx = open(&facade);
        let broker = ActorContext::new(user("broker-1"), ActorRole::Broker).for_transaction(tx.record.id);
        let members = facade.list_participants(Some(&broker), tx.record.id).unwrap();
        let roles: Vec<_> = members.record.iter().map(|p| p.role).collect();
        assert_eq!(roles, vec![ParticipantRole::Broker, ParticipantRole::Client]);
    }

    #[test]
    fn test_admin_must_name_broker() {
        let facade = TransactionMutationFacade::in_memory();
        let admin = ActorContext::new(user("admin-1"), ActorRole::Admin);
        let err = facade
            .create_transaction(
                Some(&admin),
                CreateTransaction {
                    side: TransactionSide::SellSide,
                    client_id: user("client-1"),
                    broker_id: None,
                    property_address: "1 Main St".into(),
                    initial_stage: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.field(), Some(Field::BrokerId));
    }

    #[test]
    fn test_broker_cannot_open_for_someone_else() {
        let facade = TransactionMutationFacade::in_memory();
        let broker = ActorContext::new(user("broker-1"), ActorRole::Broker);
        let err = facade
            .create_transaction(
                Some(&broker),
                CreateTransaction {
                    side: TransactionSide::SellSide,
                    client_id: user("client-1"),
                    broker_id: Some(user("broker-2")),
                    property_address: "1 Main St".into(),
                    initial_stage: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), RejectionKind::ValidationError);
        assert_eq!(err.field(), Some(Field::BrokerId));
    }

    #[test]
    fn test_unknown_transaction_is_not_found() {
        let facade = TransactionMutationFacade::in_memory();
        let id = TransactionId::new();
        let admin = ActorContext::new(user("admin-1"), ActorRole::Admin).for_transaction(id);
        let err = facade.get_transaction(Some(&admin), id).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::NotFound);
    }
}
