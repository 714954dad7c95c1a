//! # tmx-engine — Transaction Mutation Facade
//!
//! Composes the stage catalog, the document-request lifecycle and the
//! permission gate behind one facade. Every mutation is authenticated,
//! permission-checked, validated and then persisted with compare-and-swap;
//! committed changes go to a [`NotificationSink`].
//!
//! ## Modules
//!
//! - `facade.rs`: [`TransactionMutationFacade`], the verbs.
//! - `command.rs`: verb inputs.
//! - `error.rs`: [`Rejection`] and its [`RejectionKind`].
//! - `store.rs` / `repository.rs`: versioned storage and its seam.
//! - `events.rs`: the notification hook.

pub mod command;
pub mod error;
pub mod events;
pub mod facade;
pub mod repository;
pub mod store;

pub use command::{
    AddParticipant, CreateTransaction, EditDocument, EditTransaction, TransitionDocument,
    TransitionTransaction, UpdateGrants,
};
pub use error::{Rejection, RejectionKind};
pub use events::{EngineEvent, NotificationSink, RecordingNotifier, TracingNotifier};
pub use facade::{EngineResult, TransactionMutationFacade};
pub use repository::{InMemoryRepository, ReadSet, Repository};
pub use store::{StoreError, Versioned, VersionedStore};
