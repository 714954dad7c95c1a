//! # Transaction Lifecycle
//!
//! A brokerage transaction moves through its side's stage sequence until it
//! is closed or terminated. Archiving is orthogonal to both: an archived
//! transaction keeps its stage and status but can no longer be edited (the
//! access gate enforces that part).
//!
//! ## Status
//!
//! ```text
//! ACTIVE ──▶ CLOSED_SUCCESSFULLY (terminal)
//!    │
//!    └────▶ TERMINATED_EARLY    (terminal)
//! ```
//!
//! A terminal status freezes stage progression.

use std::fmt;

use serde::{Deserialize, Serialize};

use tmx_core::{Field, Timestamp, TransactionId, UserId};

use crate::error::LifecycleError;
use crate::stage::{
    ensure_stage_on_side, is_terminated_stage, resolve_stage_index, stages_for_side, ResolvedStage, StageId, StageRef,
    StageResolutionError, TransactionSide,
};

// ─── Status ──────────────────────────────────────────────────────────

/// Business status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Open and progressing through stages.
    Active,
    /// Completed (deed signed, keys handed over).
    ClosedSuccessfully,
    /// Abandoned before completion.
    TerminatedEarly,
}

impl TransactionStatus {
    /// Whether this status freezes further progression.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// The stable upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::ClosedSuccessfully => "CLOSED_SUCCESSFULLY",
            Self::TerminatedEarly => "TERMINATED_EARLY",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Actions ─────────────────────────────────────────────────────────

/// A stage or status action on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionAction {
    /// Jump to a specific stage of the transaction's side.
    ChangeStage {
        /// Target stage.
        stage: StageId,
    },
    /// Move to the next stage in sequence.
    AdvanceStage,
    /// Mark the transaction as successfully closed.
    Close {
        #[serde(default)]
        note: Option<String>,
    },
    /// Mark the transaction as terminated early.
    Terminate {
        #[serde(default)]
        note: Option<String>,
    },
    /// Archive the transaction.
    Archive,
    /// Restore an archived transaction.
    Unarchive,
}

impl TransactionAction {
    /// The stable upper-case action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChangeStage { .. } => "CHANGE_STAGE",
            Self::AdvanceStage => "ADVANCE_STAGE",
            Self::Close { .. } => "CLOSE",
            Self::Terminate { .. } => "TERMINATE",
            Self::Archive => "ARCHIVE",
            Self::Unarchive => "UNARCHIVE",
        }
    }

    /// Whether the action moves the current stage.
    pub fn is_stage_change(&self) -> bool {
        matches!(self, Self::ChangeStage { .. } | Self::AdvanceStage)
    }
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of an applied transaction action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTransitionRecord {
    /// Action name (`CHANGE_STAGE`, `CLOSE`, ...).
    pub action: String,
    /// Stage before the action, as stored.
    pub from_stage: StageRef,
    /// Stage after the action.
    pub to_stage: StageRef,
    /// Status before the action.
    pub from_status: TransactionStatus,
    /// Status after the action.
    pub to_status: TransactionStatus,
    /// Who applied the action.
    pub actor: UserId,
    /// When the action was applied.
    pub timestamp: Timestamp,
    /// Optional free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ─── Transaction ─────────────────────────────────────────────────────

/// Input for opening a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Side the brokerage represents.
    pub side: TransactionSide,
    /// The represented client.
    pub client_id: UserId,
    /// The owning broker.
    pub broker_id: UserId,
    /// Street address of the property.
    pub property_address: String,
    /// Starting stage; defaults to the first stage of the side.
    #[serde(default)]
    pub initial_stage: Option<StageId>,
}

/// A brokerage transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub side: TransactionSide,
    pub client_id: UserId,
    pub broker_id: UserId,
    pub property_address: String,
    /// Current stage: a stage identifier, or a legacy 1-based ordinal on
    /// records written before identifiers existed.
    pub current_stage: StageRef,
    /// Stage count cached when the record was written. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_stages: Option<u32>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub archived: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Ordered log of applied actions.
    #[serde(default)]
    pub transitions: Vec<TransactionTransitionRecord>,
}

impl Transaction {
    /// Open a new ACTIVE transaction.
    pub fn open(id: TransactionId, new: NewTransaction) -> Result<Self, LifecycleError> {
        let address = new.property_address.trim();
        if address.is_empty() {
            return Err(LifecycleError::field(
                Field::PropertyAddress,
                "property address must not be blank",
            ));
        }
        if new.client_id == new.broker_id {
            return Err(LifecycleError::field(
                Field::ClientId,
                "client and broker must be different users",
            ));
        }
        let stages = stages_for_side(new.side);
        let initial = match new.initial_stage {
            Some(stage) => {
                ensure_stage_on_side(stage, new.side)?;
                stage
            }
            None => stages[0],
        };
        let now = Timestamp::now();
        Ok(Self {
            id,
            side: new.side,
            client_id: new.client_id,
            broker_id: new.broker_id,
            property_address: address.to_string(),
            current_stage: initial.into(),
            total_stages: u32::try_from(stages.len()).ok(),
            status: TransactionStatus::Active,
            archived: false,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        })
    }

    /// The authoritative stage sequence for this transaction.
    pub fn stages(&self) -> &'static [StageId] {
        stages_for_side(self.side)
    }

    /// The current stage resolved against the catalog.
    pub fn resolved_stage(&self) -> Result<ResolvedStage, StageResolutionError> {
        ResolvedStage::resolve(self.side, &self.current_stage, self.status)
    }

    /// Whether the transaction is at its last stage or in a terminal status.
    pub fn is_terminated(&self) -> bool {
        is_terminated_stage(&self.current_stage, self.stages(), self.status)
    }

    /// Apply a stage or status action.
    pub fn apply(
        &mut self,
        action: &TransactionAction,
        actor: &UserId,
    ) -> Result<(), LifecycleError> {
        match action {
            TransactionAction::ChangeStage { stage } => self.change_stage(*stage, actor),
            TransactionAction::AdvanceStage => self.advance_stage(actor).map(|_| ()),
            TransactionAction::Close { note } => {
                self.finish(TransactionStatus::ClosedSuccessfully, action, actor, note.clone())
            }
            TransactionAction::Terminate { note } => {
                self.finish(TransactionStatus::TerminatedEarly, action, actor, note.clone())
            }
            TransactionAction::Archive => self.set_archived(true, action, actor),
            TransactionAction::Unarchive => self.set_archived(false, action, actor),
        }
    }

    /// Move to `stage`, which must belong to this transaction's side.
    ///
    /// A current stage that no longer resolves can still be overwritten.
    pub fn change_stage(&mut self, stage: StageId, actor: &UserId) -> Result<(), LifecycleError> {
        self.require_progressing("CHANGE_STAGE")?;
        ensure_stage_on_side(stage, self.side)?;
        let target = StageRef::from(stage);
        if let Ok(index) = resolve_stage_index(&self.current_stage, self.stages()) {
            if self.stages()[index] == stage {
                return Err(LifecycleError::invalid(stage, "CHANGE_STAGE"));
            }
        }
        self.record("CHANGE_STAGE", target, self.status, actor, None);
        Ok(())
    }

    /// Move to the next stage. Fails on the last stage.
    pub fn advance_stage(&mut self, actor: &UserId) -> Result<StageId, LifecycleError> {
        self.require_progressing("ADVANCE_STAGE")?;
        let stages = self.stages();
        let index = resolve_stage_index(&self.current_stage, stages)?;
        let Some(next) = stages.get(index + 1).copied() else {
            return Err(LifecycleError::invalid(stages[index], "ADVANCE_STAGE"));
        };
        self.record("ADVANCE_STAGE", next.into(), self.status, actor, None);
        Ok(next)
    }

    /// Replace the property address.
    pub fn set_property_address(&mut self, address: &str) -> Result<(), LifecycleError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(LifecycleError::field(
                Field::PropertyAddress,
                "property address must not be blank",
            ));
        }
        self.property_address = address.to_string();
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn finish(
        &mut self,
        to: TransactionStatus,
        action: &TransactionAction,
        actor: &UserId,
        note: Option<String>,
    ) -> Result<(), LifecycleError> {
        self.require_progressing(action.as_str())?;
        let stage = self.current_stage.clone();
        self.record(action.as_str(), stage, to, actor, note);
        Ok(())
    }

    fn set_archived(
        &mut self,
        archived: bool,
        action: &TransactionAction,
        actor: &UserId,
    ) -> Result<(), LifecycleError> {
        if self.archived == archived {
            let from = if self.archived { "ARCHIVED" } else { "NOT_ARCHIVED" };
            return Err(LifecycleError::invalid(from, action));
        }
        let stage = self.current_stage.clone();
        self.record(action.as_str(), stage, self.status, actor, None);
        self.archived = archived;
        Ok(())
    }

    fn require_progressing(&self, attempted: &str) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(LifecycleError::invalid(self.status, attempted));
        }
        Ok(())
    }

    fn record(
        &mut self,
        action: &str,
        to_stage: StageRef,
        to_status: TransactionStatus,
        actor: &UserId,
        note: Option<String>,
    ) {
        let now = Timestamp::now();
        self.transitions.push(TransactionTransitionRecord {
            action: action.to_string(),
            from_stage: self.current_stage.clone(),
            to_stage: to_stage.clone(),
            from_status: self.status,
            to_status,
            actor: actor.clone(),
            timestamp: now,
            note,
        });
        self.current_stage = to_stage;
        self.status = to_status;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
