//! # tmx-state — Transaction and Document Lifecycles
//!
//! Pure state machines for the brokerage engine. Nothing in this crate
//! performs I/O, checks permissions, or knows how records are stored; it
//! answers "is this transition valid from this state, and what is the next
//! state?".
//!
//! ## State Machines
//!
//! - **Stage catalog** (`stage.rs`): the ordered stage sequence for each
//!   transaction side and resolution of the current stage from either its
//!   stable string identifier or a legacy 1-based ordinal.
//!
//! - **Transaction** (`transaction.rs`): stage changes and the terminal
//!   status actions (close, terminate) plus archiving.
//!
//! - **Document request** (`document.rs`):
//!   `DRAFT → REQUESTED → SUBMITTED → APPROVED` with the
//!   `NEEDS_REVISION → SUBMITTED` resubmission loop, the signature
//!   sub-flow, and removal of drafts.
//!
//! ## Design
//!
//! Both lifecycles use enum states with validated transitions returning
//! `Result`, in the style of the entity and license machines: the state
//! space is small, persisted as plain strings, and must round-trip through
//! storage, so a runtime-checked enum is preferred over typestate.

pub mod document;
pub mod error;
pub mod stage;
pub mod transaction;

// ─── Stage catalog re-exports ───────────────────────────────────────

pub use stage::{
    is_terminated_stage, resolve_stage_index, resolve_stage_index_or_first, stages_for_side,
    ResolvedStage, StageId, StageRef, StageResolutionError, TransactionSide,
};

// ─── Transaction re-exports ─────────────────────────────────────────

pub use transaction::{
    NewTransaction, Transaction, TransactionAction, TransactionStatus,
    TransactionTransitionRecord,
};

// ─── Document request re-exports ────────────────────────────────────

pub use document::{
    DocumentEdit, DocumentRequest, DocumentStatus, DocumentTransition,
    DocumentTransitionRecord, NewDocumentRequest, SendMode, Submission, TransitionKind,
    UploadCompletion,
};

// ─── Error re-exports ───────────────────────────────────────────────

pub use error::LifecycleError;
