//! # Document Request Lifecycle
//!
//! A broker asks a client for a document; the client uploads it; the broker
//! approves it or sends it back for revision.
//!
//! ## States
//!
//! ```text
//!   DRAFT ──SendRequest/Share──▶ REQUESTED ──Submit──▶ SUBMITTED ──Approve──▶ APPROVED
//!     │                                                   │    ▲
//!     │ Delete                              RequestRevision    │ Submit
//!     ▼                                                   ▼    │
//!  (removed)                                         NEEDS_REVISION
//! ```
//!
//! `AttachFile` and `Edit` keep the status. A signature-required request
//! can only leave DRAFT once a file is attached; `Share` always needs one.
//!
//! ## Exhaustiveness
//!
//! [`DocumentStatus::permits`] is the single source for which
//! [`TransitionKind`] is valid from which status; every entry point checks
//! it first and fails with `InvalidTransition` otherwise.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tmx_core::{DocumentRequestId, Field, FieldError, FileRef, Timestamp, TransactionId, UserId};

use crate::error::LifecycleError;
use crate::stage::{ensure_stage_on_side, StageId, TransactionSide};

// ─── Status ──────────────────────────────────────────────────────────

/// Status of a document request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Prepared by the broker, not yet visible to the client.
    Draft,
    /// Sent to the client, awaiting upload.
    Requested,
    /// Uploaded by the client, awaiting review.
    Submitted,
    /// Accepted by the broker.
    Approved,
    /// Sent back to the client with a revision note.
    NeedsRevision,
}

impl DocumentStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [DocumentStatus; 5] = [
        Self::Draft,
        Self::Requested,
        Self::Submitted,
        Self::Approved,
        Self::NeedsRevision,
    ];

    /// The stable upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Requested => "REQUESTED",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::NeedsRevision => "NEEDS_REVISION",
        }
    }

    /// Whether `kind` is valid from this status.
    pub fn permits(&self, kind: TransitionKind) -> bool {
        use DocumentStatus::*;
        use TransitionKind::*;
        match kind {
            AttachFile | SendRequest | Share | Delete => matches!(self, Draft),
            Submit => matches!(self, Requested | NeedsRevision),
            Approve | RequestRevision => matches!(self, Submitted),
            Edit => matches!(self, Draft | Requested),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Transition kinds ────────────────────────────────────────────────

/// Every kind of operation on a document request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    AttachFile,
    SendRequest,
    Submit,
    Approve,
    RequestRevision,
    Share,
    Edit,
    Delete,
}

impl TransitionKind {
    /// All kinds, in the order used by the lifecycle matrix.
    pub const ALL: [TransitionKind; 8] = [
        Self::AttachFile,
        Self::SendRequest,
        Self::Submit,
        Self::Approve,
        Self::RequestRevision,
        Self::Share,
        Self::Edit,
        Self::Delete,
    ];

    /// The stable upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttachFile => "ATTACH_FILE",
            Self::SendRequest => "SEND_REQUEST",
            Self::Submit => "SUBMIT",
            Self::Approve => "APPROVE",
            Self::RequestRevision => "REQUEST_REVISION",
            Self::Share => "SHARE",
            Self::Edit => "EDIT",
            Self::Delete => "DELETE",
        }
    }

    /// The status after applying this kind from `from`.
    ///
    /// `None` when the kind is not valid from `from`, and for `Delete`,
    /// which removes the request.
    pub fn resulting_status(&self, from: DocumentStatus) -> Option<DocumentStatus> {
        if !from.permits(*self) {
            return None;
        }
        match self {
            Self::AttachFile | Self::Edit => Some(from),
            Self::SendRequest | Self::Share => Some(DocumentStatus::Requested),
            Self::Submit => Some(DocumentStatus::Submitted),
            Self::Approve => Some(DocumentStatus::Approved),
            Self::RequestRevision => Some(DocumentStatus::NeedsRevision),
            Self::Delete => None,
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Upload completion ───────────────────────────────────────────────

/// Outcome of an external file upload.
///
/// Uploads go straight to the object store; the engine only hears how
/// they ended. A file reference is recorded for `Completed` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadCompletion {
    /// The object is fully stored under `file_ref`.
    Completed { file_ref: FileRef },
    /// The user cancelled the upload.
    Cancelled,
    /// The upload failed.
    Failed { reason: String },
}

impl UploadCompletion {
    /// The stored file, or a `FILE` validation error.
    pub fn into_file_ref(self) -> Result<FileRef, FieldError> {
        match self {
            Self::Completed { file_ref } => Ok(file_ref),
            Self::Cancelled => Err(FieldError::new(Field::File, "upload was cancelled")),
            Self::Failed { reason } => Err(FieldError::new(
                Field::File,
                format!("upload failed: {reason}"),
            )),
        }
    }
}

// ─── Transitions ─────────────────────────────────────────────────────

/// A status-level operation on a document request.
///
/// `Edit` and `Delete` have their own entry points
/// ([`DocumentRequest::edit`], [`DocumentRequest::ensure_deletable`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentTransition {
    /// Broker attaches a file to a draft (e.g. the form to be signed).
    AttachFile { upload: UploadCompletion },
    /// Broker sends the draft to the client.
    SendRequest,
    /// Client uploads the requested document.
    Submit { upload: UploadCompletion },
    /// Broker accepts the submission.
    Approve {
        #[serde(default)]
        note: Option<String>,
    },
    /// Broker sends the submission back.
    RequestRevision { note: String },
    /// Broker publishes a document it uploaded itself.
    Share,
}

impl DocumentTransition {
    /// The kind of this transition.
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::AttachFile { .. } => TransitionKind::AttachFile,
            Self::SendRequest => TransitionKind::SendRequest,
            Self::Submit { .. } => TransitionKind::Submit,
            Self::Approve { .. } => TransitionKind::Approve,
            Self::RequestRevision { .. } => TransitionKind::RequestRevision,
            Self::Share => TransitionKind::Share,
        }
    }
}

/// How a request left DRAFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendMode {
    /// Asked the client for a document.
    Request,
    /// Published a broker-uploaded document.
    Share,
}

/// A file submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub file_ref: FileRef,
    pub submitted_by: UserId,
    pub submitted_at: Timestamp,
}

/// Record of an applied document operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTransitionRecord {
    pub kind: TransitionKind,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub actor: UserId,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// Input for creating a document request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocumentRequest {
    /// Document type code (e.g. `PROOF_OF_FUNDS`).
    pub doc_type: String,
    #[serde(default)]
    pub custom_title: Option<String>,
    /// Stage the document belongs to.
    pub stage: StageId,
    #[serde(default)]
    pub requires_signature: bool,
    /// DRAFT or REQUESTED.
    #[serde(default = "default_initial_status")]
    pub initial_status: DocumentStatus,
    /// File already uploaded by the broker, if any.
    #[serde(default)]
    pub file_ref: Option<FileRef>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

fn default_initial_status() -> DocumentStatus {
    DocumentStatus::Draft
}

/// Field changes to a DRAFT or REQUESTED request. `None` leaves a field
/// unchanged; a blank title or instructions clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEdit {
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub custom_title: Option<String>,
    #[serde(default)]
    pub stage: Option<StageId>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl DocumentEdit {
    /// Whether the edit changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ─── Document request ────────────────────────────────────────────────

/// A document request record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub id: DocumentRequestId,
    pub transaction_id: TransactionId,
    pub doc_type: String,
    #[serde(default)]
    pub custom_title: Option<String>,
    pub stage: StageId,
    pub status: DocumentStatus,
    pub requires_signature: bool,
    #[serde(default)]
    pub attached_file_ref: Option<FileRef>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// The broker-side user who created the request.
    pub created_by: UserId,
    /// Set once the request leaves DRAFT.
    #[serde(default)]
    pub sent_via: Option<SendMode>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub review_note: Option<String>,
    #[serde(default)]
    pub revision_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub transitions: Vec<DocumentTransitionRecord>,
}

impl DocumentRequest {
    /// Create a request in DRAFT or REQUESTED.
    pub fn create(
        id: DocumentRequestId,
        transaction_id: TransactionId,
        side: TransactionSide,
        new: NewDocumentRequest,
        created_by: UserId,
    ) -> Result<Self, LifecycleError> {
        let sent_via = match new.initial_status {
            DocumentStatus::Draft => None,
            DocumentStatus::Requested => Some(SendMode::Request),
            other => {
                return Err(LifecycleError::field(
                    Field::Status,
                    format!("a document request cannot be created as {other}"),
                ))
            }
        };
        let doc_type = required_doc_type(&new.doc_type)?;
        ensure_stage_on_side(new.stage, side)?;
        if new.requires_signature
            && new.initial_status == DocumentStatus::Requested
            && new.file_ref.is_none()
        {
            return Err(LifecycleError::field(
                Field::File,
                "a signature-required request needs an attached file before it is sent",
            ));
        }
        let now = Timestamp::now();
        Ok(Self {
            id,
            transaction_id,
            doc_type,
            custom_title: non_blank(new.custom_title),
            stage: new.stage,
            status: new.initial_status,
            requires_signature: new.requires_signature,
            attached_file_ref: new.file_ref,
            due_date: new.due_date,
            instructions: non_blank(new.instructions),
            created_by,
            sent_via,
            submissions: Vec::new(),
            review_note: None,
            revision_note: None,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        })
    }

    /// Apply a status-level transition and return the new status.
    pub fn apply(
        &mut self,
        transition: DocumentTransition,
        actor: &UserId,
    ) -> Result<DocumentStatus, LifecycleError> {
        let kind = transition.kind();
        self.require(kind)?;
        match transition {
            DocumentTransition::AttachFile { upload } => {
                self.attached_file_ref = Some(upload.into_file_ref()?);
                self.record(kind, self.status, actor, None);
            }
            DocumentTransition::SendRequest => {
                if self.requires_signature && self.attached_file_ref.is_none() {
                    return Err(LifecycleError::field(
                        Field::File,
                        "a signature-required request needs an attached file before it is sent",
                    ));
                }
                self.sent_via = Some(SendMode::Request);
                self.record(kind, DocumentStatus::Requested, actor, None);
            }
            DocumentTransition::Share => {
                if self.attached_file_ref.is_none() {
                    return Err(LifecycleError::field(
                        Field::File,
                        "a shared document needs an attached file",
                    ));
                }
                self.sent_via = Some(SendMode::Share);
                self.record(kind, DocumentStatus::Requested, actor, None);
            }
            DocumentTransition::Submit { upload } => {
                let file_ref = upload.into_file_ref()?;
                let now = Timestamp::now();
                self.submissions.push(Submission {
                    file_ref,
                    submitted_by: actor.clone(),
                    submitted_at: now,
                });
                self.record(kind, DocumentStatus::Submitted, actor, None);
            }
            DocumentTransition::Approve { note } => {
                let note = non_blank(note);
                self.review_note = note.clone();
                self.record(kind, DocumentStatus::Approved, actor, note);
            }
            DocumentTransition::RequestRevision { note } => {
                let note = note.trim();
                if note.is_empty() {
                    return Err(LifecycleError::field(
                        Field::RevisionNote,
                        "a revision request needs a note for the client",
                    ));
                }
                self.revision_note = Some(note.to_string());
                self.record(kind, DocumentStatus::NeedsRevision, actor, Some(note.to_string()));
            }
        }
        Ok(self.status)
    }

    /// Apply field changes. Only DRAFT and REQUESTED requests are editable.
    pub fn edit(
        &mut self,
        edit: DocumentEdit,
        side: TransactionSide,
        actor: &UserId,
    ) -> Result<(), LifecycleError> {
        self.require(TransitionKind::Edit)?;
        let doc_type = edit.doc_type.as_deref().map(required_doc_type).transpose()?;
        if let Some(stage) = edit.stage {
            ensure_stage_on_side(stage, side)?;
        }

        if let Some(doc_type) = doc_type {
            self.doc_type = doc_type;
        }
        if let Some(title) = edit.custom_title {
            self.custom_title = non_blank(Some(title));
        }
        if let Some(stage) = edit.stage {
            self.stage = stage;
        }
        if let Some(instructions) = edit.instructions {
            self.instructions = non_blank(Some(instructions));
        }
        if let Some(due) = edit.due_date {
            self.due_date = Some(due);
        }
        self.record(TransitionKind::Edit, self.status, actor, None);
        Ok(())
    }

    /// Succeeds only for DRAFT requests; anything sent is kept for the record.
    pub fn ensure_deletable(&self) -> Result<(), LifecycleError> {
        self.require(TransitionKind::Delete)
    }

    /// Whether `user` created this request.
    pub fn is_draft_owner(&self, user: &UserId) -> bool {
        &self.created_by == user
    }

    /// Drafts are visible to their creator only.
    pub fn is_visible_to(&self, user: &UserId) -> bool {
        self.status != DocumentStatus::Draft || self.is_draft_owner(user)
    }

    /// The most recent client submission.
    pub fn latest_submission(&self) -> Option<&Submission> {
        self.submissions.last()
    }

    fn require(&self, kind: TransitionKind) -> Result<(), LifecycleError> {
        if !self.status.permits(kind) {
            return Err(LifecycleError::invalid(self.status, kind));
        }
        Ok(())
    }

    fn record(
        &mut self,
        kind: TransitionKind,
        to: DocumentStatus,
        actor: &UserId,
        note: Option<String>,
    ) {
        let now = Timestamp::now();
        self.transitions.push(DocumentTransitionRecord {
            kind,
            from: self.status,
            to,
            actor: actor.clone(),
            timestamp: now,
            note,
        });
        self.status = to;
        self.updated_at = now;
    }
}

fn required_doc_type(raw: &str) -> Result<String, LifecycleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LifecycleError::field(
            Field::DocType,
            "document type must not be blank",
        ));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn file(s: &str) -> FileRef {
        FileRef::new(s).unwrap()
    }

    fn completed(s: &str) -> UploadCompletion {
        UploadCompletion::Completed { file_ref: file(s) }
    }

    fn new_request(requires_signature: bool, initial_status: DocumentStatus) -> NewDocumentRequest {
        NewDocumentRequest {
            doc_type: "PURCHASE_OFFER".into(),
            custom_title: None,
            stage: StageId::BuyerSubmitOffer,
            requires_signature,
            initial_status,
            file_ref: None,
            instructions: Some("Sign pages 2 and 4".into()),
            due_date: None,
        }
    }

    fn create(new: NewDocumentRequest) -> Result<DocumentRequest, LifecycleError> {
        DocumentRequest::create(
            DocumentRequestId::new(),
            TransactionId::new(),
            TransactionSide::BuySide,
            new,
            user("broker-1"),
        )
    }

    fn draft(requires_signature: bool) -> DocumentRequest {
        create(new_request(requires_signature, DocumentStatus::Draft)).unwrap()
    }

    fn field_of(err: &LifecycleError) -> Option<Field> {
        match err {
            LifecycleError::Validation(fe) => Some(fe.field),
            _ => None,
        }
    }

    // ── Create ───────────────────────────────────────────────────────

    #[test]
    fn test_create_signature_required_requested_without_file_rejected() {
        let err = create(new_request(true, DocumentStatus::Requested)).unwrap_err();
        assert_eq!(field_of(&err), Some(Field::File));
    }

    #[test]
    fn test_create_requested_without_signature_needs_no_file() {
        let doc = create(new_request(false, DocumentStatus::Requested)).unwrap();
        assert_eq!(doc.status, DocumentStatus::Requested);
        assert_eq!(doc.sent_via, Some(SendMode::Request));
        assert!(doc.attached_file_ref.is_none());
    }

    #[test]
    fn test_create_signature_required_requested_with_file() {
        let mut new = new_request(true, DocumentStatus::Requested);
        new.file_ref = Some(file("forms/offer.pdf"));
        let doc = create(new).unwrap();
        assert_eq!(doc.status, DocumentStatus::Requested);
    }

    #[test]
    fn test_create_rejects_other_initial_statuses() {
        for status in [
            DocumentStatus::Submitted,
            DocumentStatus::Approved,
            DocumentStatus::NeedsRevision,
        ] {
            let err = create(new_request(false, status)).unwrap_err();
            assert_eq!(field_of(&err), Some(Field::Status));
        }
    }

    #[test]
    fn test_create_validates_doc_type_and_stage() {
        let mut new = new_request(false, DocumentStatus::Draft);
        new.doc_type = "  ".into();
        assert_eq!(field_of(&create(new).unwrap_err()), Some(Field::DocType));

        let mut new = new_request(false, DocumentStatus::Draft);
        new.stage = StageId::SellerListingPublished;
        assert_eq!(field_of(&create(new).unwrap_err()), Some(Field::Stage));
    }

    // ── Signature sub-flow ───────────────────────────────────────────

    #[test]
    fn test_attach_then_send_signature_request() {
        let broker = user("broker-1");
        let mut doc = draft(true);

        let err = doc.apply(DocumentTransition::SendRequest, &broker).unwrap_err();
        assert_eq!(field_of(&err), Some(Field::File));
        assert_eq!(doc.status, DocumentStatus::Draft);

        doc.apply(
            DocumentTransition::AttachFile { upload: completed("forms/offer.pdf") },
            &broker,
        )
        .unwrap();
        let status = doc.apply(DocumentTransition::SendRequest, &broker).unwrap();
        assert_eq!(status, DocumentStatus::Requested);
        assert_eq!(doc.attached_file_ref, Some(file("forms/offer.pdf")));
    }

    #[test]
    fn test_unfinished_upload_never_records_file() {
        let broker = user("broker-1");
        let mut doc = draft(true);
        for upload in [
            UploadCompletion::Cancelled,
            UploadCompletion::Failed { reason: "connection reset".into() },
        ] {
            let err = doc
                .apply(DocumentTransition::AttachFile { upload }, &broker)
                .unwrap_err();
            assert_eq!(field_of(&err), Some(Field::File));
        }
        assert!(doc.attached_file_ref.is_none());
        assert!(doc.transitions.is_empty());
    }

    #[test]
    fn test_share_requires_file() {
        let broker = user("broker-1");
        let mut doc = draft(false);
        let err = doc.apply(DocumentTransition::Share, &broker).unwrap_err();
        assert_eq!(field_of(&err), Some(Field::File));

        doc.apply(
            DocumentTransition::AttachFile { upload: completed("shared/inspection.pdf") },
            &broker,
        )
        .unwrap();
        doc.apply(DocumentTransition::Share, &broker).unwrap();
        assert_eq!(doc.status, DocumentStatus::Requested);
        assert_eq!(doc.sent_via, Some(SendMode::Share));
    }

    // ── Review loop ──────────────────────────────────────────────────

    #[test]
    fn test_full_review_loop() {
        let broker = user("broker-1");
        let client = user("client-1");
        let mut doc = create(new_request(false, DocumentStatus::Requested)).unwrap();

        doc.apply(DocumentTransition::Submit { upload: completed("up/v1.pdf") }, &client)
            .unwrap();
        assert_eq!(doc.status, DocumentStatus::Submitted);

        let err = doc
            .apply(DocumentTransition::RequestRevision { note: " ".into() }, &broker)
            .unwrap_err();
        assert_eq!(field_of(&err), Some(Field::RevisionNote));

        doc.apply(
            DocumentTransition::RequestRevision { note: "Page 3 is missing".into() },
            &broker,
        )
        .unwrap();
        assert_eq!(doc.status, DocumentStatus::NeedsRevision);
        assert_eq!(doc.revision_note.as_deref(), Some("Page 3 is missing"));

        doc.apply(DocumentTransition::Submit { upload: completed("up/v2.pdf") }, &client)
            .unwrap();
        doc.apply(DocumentTransition::Approve { note: None }, &broker).unwrap();
        assert_eq!(doc.status, DocumentStatus::Approved);
        assert_eq!(doc.submissions.len(), 2);
        assert_eq!(doc.latest_submission().unwrap().file_ref, file("up/v2.pdf"));

        let kinds: Vec<_> = doc.transitions.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransitionKind::Submit,
                TransitionKind::RequestRevision,
                TransitionKind::Submit,
                TransitionKind::Approve,
            ]
        );
    }

    #[test]
    fn test_cancelled_submission_keeps_status() {
        let client = user("client-1");
        let mut doc = create(new_request(false, DocumentStatus::Requested)).unwrap();
        let err = doc
            .apply(DocumentTransition::Submit { upload: UploadCompletion::Cancelled }, &client)
            .unwrap_err();
        assert_eq!(field_of(&err), Some(Field::File));
        assert_eq!(doc.status, DocumentStatus::Requested);
        assert!(doc.submissions.is_empty());
    }

    // ── Edit / delete ────────────────────────────────────────────────

    #[test]
    fn test_edit_while_requested() {
        let broker = user("broker-1");
        let mut doc = create(new_request(false, DocumentStatus::Requested)).unwrap();
        doc.edit(
            DocumentEdit {
                custom_title: Some("Signed offer".into()),
                stage: Some(StageId::BuyerOfferAccepted),
                instructions: Some("".into()),
                due_date: NaiveDate::from_ymd_opt(2026, 11, 30),
                ..DocumentEdit::default()
            },
            TransactionSide::BuySide,
            &broker,
        )
        .unwrap();
        assert_eq!(doc.custom_title.as_deref(), Some("Signed offer"));
        assert_eq!(doc.stage, StageId::BuyerOfferAccepted);
        assert_eq!(doc.instructions, None);
        assert_eq!(doc.due_date, NaiveDate::from_ymd_opt(2026, 11, 30));
        assert_eq!(doc.status, DocumentStatus::Requested);
    }

    #[test]
    fn test_edit_is_all_or_nothing() {
        let broker = user("broker-1");
        let mut doc = draft(false);
        let before = doc.clone();
        let err = doc
            .edit(
                DocumentEdit {
                    custom_title: Some("New title".into()),
                    stage: Some(StageId::SellerReviewOffers),
                    ..DocumentEdit::default()
                },
                TransactionSide::BuySide,
                &broker,
            )
            .unwrap_err();
        assert_eq!(field_of(&err), Some(Field::Stage));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_delete_only_from_draft() {
        assert!(draft(false).ensure_deletable().is_ok());
        let doc = create(new_request(false, DocumentStatus::Requested)).unwrap();
        assert_eq!(
            doc.ensure_deletable().unwrap_err(),
            LifecycleError::invalid("REQUESTED", "DELETE")
        );
    }

    #[test]
    fn test_draft_visibility() {
        let mut doc = draft(false);
        assert!(doc.is_visible_to(&user("broker-1")));
        assert!(!doc.is_visible_to(&user("client-1")));
        assert!(!doc.is_visible_to(&user("broker-2")));
        doc.status = DocumentStatus::Requested;
        assert!(doc.is_visible_to(&user("client-1")));
    }

    // ── Exhaustive matrix ────────────────────────────────────────────

    /// A document in `status` with everything a valid transition needs.
    fn in_status(status: DocumentStatus) -> DocumentRequest {
        let mut doc = draft(true);
        doc.attached_file_ref = Some(file("forms/offer.pdf"));
        doc.status = status;
        doc
    }

    fn attempt(doc: &mut DocumentRequest, kind: TransitionKind) -> Result<(), LifecycleError> {
        let actor = user("actor-1");
        let transition = match kind {
            TransitionKind::AttachFile => DocumentTransition::AttachFile { upload: completed("a.pdf") },
            TransitionKind::SendRequest => DocumentTransition::SendRequest,
            TransitionKind::Submit => DocumentTransition::Submit { upload: completed("s.pdf") },
            TransitionKind::Approve => DocumentTransition::Approve { note: None },
            TransitionKind::RequestRevision => {
                DocumentTransition::RequestRevision { note: "redo".into() }
            }
            TransitionKind::Share => DocumentTransition::Share,
            TransitionKind::Edit => {
                let edit = DocumentEdit {
                    custom_title: Some("t".into()),
                    ..DocumentEdit::default()
                };
                return doc.edit(edit, TransactionSide::BuySide, &actor);
            }
            TransitionKind::Delete => return doc.ensure_deletable(),
        };
        doc.apply(transition, &actor).map(|_| ())
    }

    #[test]
    fn test_lifecycle_matrix_is_exhaustive() {
        let mut allowed = 0;
        for status in DocumentStatus::ALL {
            for kind in TransitionKind::ALL {
                let mut doc = in_status(status);
                let result = attempt(&mut doc, kind);
                if status.permits(kind) {
                    allowed += 1;
                    assert!(result.is_ok(), "{kind} from {status} should succeed: {result:?}");
                    if let Some(to) = kind.resulting_status(status) {
                        assert_eq!(doc.status, to, "{kind} from {status}");
                    }
                } else {
                    assert_eq!(
                        result.unwrap_err(),
                        LifecycleError::invalid(status, kind),
                        "{kind} from {status} should be rejected"
                    );
                    assert_eq!(doc.status, status);
                }
            }
        }
        assert_eq!(allowed, 10);
    }

    #[test]
    fn test_approved_is_final() {
        for kind in TransitionKind::ALL {
            let mut doc = in_status(DocumentStatus::Approved);
            assert!(matches!(
                attempt(&mut doc, kind),
                Err(LifecycleError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn test_delete_has_no_resulting_status() {
        assert_eq!(TransitionKind::Delete.resulting_status(DocumentStatus::Draft), None);
        assert_eq!(
            TransitionKind::Share.resulting_status(DocumentStatus::Draft),
            Some(DocumentStatus::Requested)
        );
        assert_eq!(TransitionKind::Share.resulting_status(DocumentStatus::Requested), None);
    }

    #[test]
    fn test_transition_wire_format() {
        let t: DocumentTransition = serde_json::from_str(
            r#"{"action":"SUBMIT","upload":{"outcome":"COMPLETED","file_ref":"up/x.pdf"}}"#,
        )
        .unwrap();
        assert_eq!(t, DocumentTransition::Submit { upload: completed("up/x.pdf") });
        let t: DocumentTransition =
            serde_json::from_str(r#"{"action":"APPROVE"}"#).unwrap();
        assert_eq!(t.kind(), TransitionKind::Approve);
        assert_eq!(
            serde_json::to_string(&DocumentStatus::NeedsRevision).unwrap(),
            "\"NEEDS_REVISION\""
        );
    }
}
