//! # Notification Hook
//!
//! Committed mutations are announced to a [`NotificationSink`] after the
//! write succeeds. Rendering and delivery (email, push, in-app feed) belong
//! to the sink; the engine only says what happened.

use parking_lot::Mutex;
use serde::Serialize;

use tmx_access::ParticipantRole;
use tmx_core::{DocumentRequestId, TransactionId, UserId};
use tmx_state::{DocumentStatus, StageRef, TransactionStatus, TransitionKind};

/// A committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    TransactionCreated {
        transaction_id: TransactionId,
        actor: UserId,
    },
    TransactionTransitioned {
        transaction_id: TransactionId,
        actor: UserId,
        action: String,
        stage: StageRef,
        status: TransactionStatus,
        archived: bool,
    },
    TransactionEdited {
        transaction_id: TransactionId,
        actor: UserId,
    },
    TransactionDeleted {
        transaction_id: TransactionId,
        actor: UserId,
    },
    DocumentCreated {
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
        actor: UserId,
        status: DocumentStatus,
    },
    DocumentTransitioned {
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
        actor: UserId,
        kind: TransitionKind,
        from: DocumentStatus,
        to: DocumentStatus,
    },
    DocumentEdited {
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
        actor: UserId,
    },
    DocumentDeleted {
        transaction_id: TransactionId,
        document_id: DocumentRequestId,
        actor: UserId,
    },
    ParticipantAdded {
        transaction_id: TransactionId,
        user_id: UserId,
        role: ParticipantRole,
        actor: UserId,
    },
    ParticipantUpdated {
        transaction_id: TransactionId,
        user_id: UserId,
        actor: UserId,
    },
    ParticipantRemoved {
        transaction_id: TransactionId,
        user_id: UserId,
        actor: UserId,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransactionCreated { .. } => "TRANSACTION_CREATED",
            Self::TransactionTransitioned { .. } => "TRANSACTION_TRANSITIONED",
            Self::TransactionEdited { .. } => "TRANSACTION_EDITED",
            Self::TransactionDeleted { .. } => "TRANSACTION_DELETED",
            Self::DocumentCreated { .. } => "DOCUMENT_CREATED",
            Self::DocumentTransitioned { .. } => "DOCUMENT_TRANSITIONED",
            Self::DocumentEdited { .. } => "DOCUMENT_EDITED",
            Self::DocumentDeleted { .. } => "DOCUMENT_DELETED",
            Self::ParticipantAdded { .. } => "PARTICIPANT_ADDED",
            Self::ParticipantUpdated { .. } => "PARTICIPANT_UPDATED",
            Self::ParticipantRemoved { .. } => "PARTICIPANT_REMOVED",
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        match self {
            Self::TransactionCreated { transaction_id, .. }
            | Self::TransactionTransitioned { transaction_id, .. }
            | Self::TransactionEdited { transaction_id, .. }
            | Self::TransactionDeleted { transaction_id, .. }
            | Self::DocumentCreated { transaction_id, .. }
            | Self::DocumentTransitioned { transaction_id, .. }
            | Self::DocumentEdited { transaction_id, .. }
            | Self::DocumentDeleted { transaction_id, .. }
            | Self::ParticipantAdded { transaction_id, .. }
            | Self::ParticipantUpdated { transaction_id, .. }
            | Self::ParticipantRemoved { transaction_id, .. } => *transaction_id,
        }
    }
}

/// Receiver of committed changes. Must not fail the mutation.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &EngineEvent);
}

/// Emits every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, event: &EngineEvent) {
        tracing::info!(
            target: "tmx::events",
            event = event.name(),
            transaction_id = %event.transaction_id(),
            "engine event"
        );
    }
}

/// Keeps events in memory, in commit order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(EngineEvent::name).collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, event: &EngineEvent) {
        self.events.lock().push(event.clone());
    }
}
