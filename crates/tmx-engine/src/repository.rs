//! # Repository
//!
//! Persistence seam of the facade. All writes are compare-and-swap on the
//! version the caller read; nothing is overwritten blindly.
//!
//! Participants are stored as one versioned list per transaction, so
//! concurrent membership changes conflict the same way record edits do.
//!
//! Every write also carries the [`ReadSet`] the permission check was made
//! against. The write commits only if the transaction and its participant
//! list are still at those versions, so an archive, a grant change or a
//! delete that lands between the check and the write turns the write into
//! a conflict.

use std::sync::Arc;

use parking_lot::Mutex;

use tmx_access::Participant;
use tmx_core::{DocumentRequestId, TransactionId};
use tmx_state::{DocumentRequest, Transaction};

use crate::store::{StoreError, Versioned, VersionedStore};

/// Versions of a transaction and its participant list as read for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSet {
    pub transaction_id: TransactionId,
    pub transaction_version: u64,
    /// A transaction without a stored list reads as version 1.
    pub participants_version: u64,
}

impl ReadSet {
    pub fn of(
        transaction: &Versioned<Transaction>,
        participants: &Versioned<Vec<Participant>>,
    ) -> Self {
        Self {
            transaction_id: transaction.record.id,
            transaction_version: transaction.version,
            participants_version: participants.version,
        }
    }
}

/// Storage operations the facade needs.
pub trait Repository: Send + Sync {
    // ── Transactions ─────────────────────────────────────────────────

    /// Store a new transaction with its initial participant list.
    fn insert_transaction(
        &self,
        transaction: Transaction,
        participants: Vec<Participant>,
    ) -> Result<Versioned<Transaction>, StoreError>;

    fn transaction(&self, id: &TransactionId) -> Option<Versioned<Transaction>>;

    /// Replace the transaction read in `read`.
    fn swap_transaction(
        &self,
        read: &ReadSet,
        transaction: Transaction,
    ) -> Result<Versioned<Transaction>, StoreError>;

    /// Remove a transaction together with its documents and participants.
    fn delete_transaction(&self, read: &ReadSet) -> Result<(), StoreError>;

    // ── Document requests ────────────────────────────────────────────

    fn insert_document(
        &self,
        read: &ReadSet,
        document: DocumentRequest,
    ) -> Result<Versioned<DocumentRequest>, StoreError>;

    fn document(&self, id: &DocumentRequestId) -> Option<Versioned<DocumentRequest>>;

    fn documents_for(&self, transaction_id: &TransactionId) -> Vec<Versioned<DocumentRequest>>;

    fn swap_document(
        &self,
        read: &ReadSet,
        expected: u64,
        document: DocumentRequest,
    ) -> Result<Versioned<DocumentRequest>, StoreError>;

    fn delete_document(
        &self,
        read: &ReadSet,
        id: &DocumentRequestId,
        expected: u64,
    ) -> Result<(), StoreError>;

    // ── Participants ─────────────────────────────────────────────────

    fn participants(&self, transaction_id: &TransactionId) -> Option<Versioned<Vec<Participant>>>;

    /// Replace the participant list read in `read`.
    fn swap_participants(
        &self,
        read: &ReadSet,
        participants: Vec<Participant>,
    ) -> Result<Versioned<Vec<Participant>>, StoreError>;
}

/// [`Repository`] backed by [`VersionedStore`]s.
///
/// Writes are serialized by one mutex so the read-set check and the write
/// it guards happen together; reads never take it.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    transactions: VersionedStore<TransactionId, Transaction>,
    documents: VersionedStore<DocumentRequestId, DocumentRequest>,
    participants: VersionedStore<TransactionId, Vec<Participant>>,
    writes: Arc<Mutex<()>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            transactions: VersionedStore::new("transaction"),
            documents: VersionedStore::new("document request"),
            participants: VersionedStore::new("participant list"),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Fails unless the transaction and its participant list are still at
    /// the versions in `read`. Call with the write lock held.
    fn verify(&self, read: &ReadSet) -> Result<(), StoreError> {
        let id = read.transaction_id;
        let transaction = self
            .transactions
            .get(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction",
                id: id.to_string(),
            })?;
        if transaction.version != read.transaction_version {
            return Err(StoreError::VersionMismatch {
                entity: "transaction",
                id: id.to_string(),
                expected: read.transaction_version,
                actual: transaction.version,
            });
        }
        let members = self.participants.get(&id).map_or(1, |p| p.version);
        if members != read.participants_version {
            return Err(StoreError::VersionMismatch {
                entity: "participant list",
                id: id.to_string(),
                expected: read.participants_version,
                actual: members,
            });
        }
        Ok(())
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for InMemoryRepository {
    fn insert_transaction(
        &self,
        transaction: Transaction,
        participants: Vec<Participant>,
    ) -> Result<Versioned<Transaction>, StoreError> {
        let _writes = self.writes.lock();
        let id = transaction.id;
        let stored = self.transactions.insert(id, transaction)?;
        if let Err(e) = self.participants.insert(id, participants) {
            // Roll back so the transaction never exists without its members.
            let _ = self.transactions.remove(&id, stored.version);
            return Err(e);
        }
        Ok(stored)
    }

    fn transaction(&self, id: &TransactionId) -> Option<Versioned<Transaction>> {
        self.transactions.get(id)
    }

    fn swap_transaction(
        &self,
        read: &ReadSet,
        transaction: Transaction,
    ) -> Result<Versioned<Transaction>, StoreError> {
        let _writes = self.writes.lock();
        self.verify(read)?;
        self.transactions
            .compare_and_swap(&read.transaction_id, read.transaction_version, transaction)
    }

    fn delete_transaction(&self, read: &ReadSet) -> Result<(), StoreError> {
        let _writes = self.writes.lock();
        self.verify(read)?;
        let id = read.transaction_id;
        self.transactions.remove(&id, read.transaction_version)?;
        self.documents.remove_where(|d| d.transaction_id == id);
        if let Some(current) = self.participants.get(&id) {
            let _ = self.participants.remove(&id, current.version);
        }
        Ok(())
    }

    fn insert_document(
        &self,
        read: &ReadSet,
        document: DocumentRequest,
    ) -> Result<Versioned<DocumentRequest>, StoreError> {
        let _writes = self.writes.lock();
        self.verify(read)?;
        self.documents.insert(document.id, document)
    }

    fn document(&self, id: &DocumentRequestId) -> Option<Versioned<DocumentRequest>> {
        self.documents.get(id)
    }

    fn documents_for(&self, transaction_id: &TransactionId) -> Vec<Versioned<DocumentRequest>> {
        let mut docs = self
            .documents
            .list_where(|d| &d.transaction_id == transaction_id);
        docs.sort_by_key(|d| d.record.created_at);
        docs
    }

    fn swap_document(
        &self,
        read: &ReadSet,
        expected: u64,
        document: DocumentRequest,
    ) -> Result<Versioned<DocumentRequest>, StoreError> {
        let _writes = self.writes.lock();
        self.verify(read)?;
        let id = document.id;
        self.documents.compare_and_swap(&id, expected, document)
    }

    fn delete_document(
        &self,
        read: &ReadSet,
        id: &DocumentRequestId,
        expected: u64,
    ) -> Result<(), StoreError> {
        let _writes = self.writes.lock();
        self.verify(read)?;
        self.documents.remove(id, expected).map(|_| ())
    }

    fn participants(&self, transaction_id: &TransactionId) -> Option<Versioned<Vec<Participant>>> {
        self.participants.get(transaction_id)
    }

    fn swap_participants(
        &self,
        read: &ReadSet,
        participants: Vec<Participant>,
    ) -> Result<Versioned<Vec<Participant>>, StoreError> {
        let _writes = self.writes.lock();
        self.verify(read)?;
        self.participants.compare_and_swap(
            &read.transaction_id,
            read.participants_version,
            participants,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmx_access::ParticipantRole;
    use tmx_core::UserId;
    use tmx_state::{DocumentStatus, NewDocumentRequest, NewTransaction, StageId, TransactionSide};

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

    fn document(tx: &Transaction) -> DocumentRequest {
        DocumentRequest::create(
            DocumentRequestId::new(),
            tx.id,
            tx.side,
            NewDocumentRequest {
                doc_type: "PROOF_OF_FUNDS".into(),
                custom_title: None,
                stage: StageId::BuyerPrequalifyFinancially,
                requires_signature: false,
                initial_status: DocumentStatus::Requested,
                file_ref: None,
                instructions: None,
                due_date: None,
            },
            user("broker-1"),
        )
        .unwrap()
    }

    fn read(repo: &InMemoryRepository, id: &TransactionId) -> ReadSet {
        let tx = repo.transaction(id).unwrap();
        let members = repo.participants(id).unwrap();
        ReadSet::of(&tx, &members)
    }

    #[test]
    fn test_delete_cascades() {
        let repo = InMemoryRepository::new();
        let tx = transaction();
        let other = transaction();
        let members = vec![Participant::new(tx.id, user("broker-1"), ParticipantRole::Broker)];
        repo.insert_transaction(tx.clone(), members).unwrap();
        repo.insert_transaction(other.clone(), Vec::new()).unwrap();
        let tx_read = read(&repo, &tx.id);
        let other_read = read(&repo, &other.id);
        repo.insert_document(&tx_read, document(&tx)).unwrap();
        repo.insert_document(&tx_read, document(&tx)).unwrap();
        repo.insert_document(&other_read, document(&other)).unwrap();

        repo.delete_transaction(&tx_read).unwrap();
        assert!(repo.transaction(&tx.id).is_none());
        assert!(repo.participants(&tx.id).is_none());
        assert!(repo.documents_for(&tx.id).is_empty());
        assert_eq!(repo.documents_for(&other.id).len(), 1);
        assert_eq!(repo.transaction_count(), 1);
    }

    #[test]
    fn test_stale_delete_keeps_everything() {
        let repo = InMemoryRepository::new();
        let tx = transaction();
        repo.insert_transaction(tx.clone(), Vec::new()).unwrap();
        let fresh = read(&repo, &tx.id);
        repo.insert_document(&fresh, document(&tx)).unwrap();
        let stale = ReadSet {
            transaction_version: 4,
            ..fresh
        };
        assert!(repo.delete_transaction(&stale).is_err());
        assert_eq!(repo.document_count(), 1);
    }

    #[test]
    fn test_participant_list_is_versioned() {
        let repo = InMemoryRepository::new();
        let tx = transaction();
        repo.insert_transaction(tx.clone(), Vec::new()).unwrap();
        let before = read(&repo, &tx.id);
        let added = vec![Participant::new(tx.id, user("client-2"), ParticipantRole::Client)];
        let v2 = repo.swap_participants(&before, added.clone()).unwrap();
        assert_eq!(v2.version, 2);
        assert!(repo.swap_participants(&before, added).is_err());
    }

    #[test]
    fn test_document_write_fails_after_transaction_moved() {
        let repo = InMemoryRepository::new();
        let tx = transaction();
        repo.insert_transaction(tx.clone(), Vec::new()).unwrap();
        let before = read(&repo, &tx.id);
        let doc = repo.insert_document(&before, document(&tx)).unwrap();

        let mut archived = tx.clone();
        archived.archived = true;
        repo.swap_transaction(&before, archived).unwrap();

        let err = repo
            .swap_document(&before, doc.version, doc.record.clone())
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionMismatch {
                entity: "transaction",
                id: tx.id.to_string(),
                expected: 1,
                actual: 2,
            }
        );
        assert!(repo.delete_document(&before, &doc.record.id, doc.version).is_err());
        assert!(repo.insert_document(&before, document(&tx)).is_err());
        assert_eq!(repo.document_count(), 1);
    }

    #[test]
    fn test_document_write_fails_after_grant_change() {
        let repo = InMemoryRepository::new();
        let tx = transaction();
        repo.insert_transaction(tx.clone(), Vec::new()).unwrap();
        let before = read(&repo, &tx.id);
        let doc = repo.insert_document(&before, document(&tx)).unwrap();
        repo.swap_participants(&before, Vec::new()).unwrap();

        let err = repo
            .swap_document(&before, doc.version, doc.record)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionMismatch {
                entity: "participant list",
                ..
            }
        ));
    }

    #[test]
    fn test_document_insert_after_delete_is_not_found() {
        let repo = InMemoryRepository::new();
        let tx = transaction();
        repo.insert_transaction(tx.clone(), Vec::new()).unwrap();
        let before = read(&repo, &tx.id);
        repo.delete_transaction(&before).unwrap();
        let err = repo.insert_document(&before, document(&tx)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "transaction", .. }));
        assert_eq!(repo.document_count(), 0);
    }
}
