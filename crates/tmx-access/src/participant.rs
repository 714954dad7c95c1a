//! # Participants and Actor Context
//!
//! An [`ActorContext`] says who is calling; a [`Participant`] says what that
//! user is on one transaction. The platform role on the context only
//! matters for administrators; for everyone else the participant record
//! decides.
//!
//! ## Role ceilings
//!
//! | Role   | Ceiling                                                   | Default          |
//! |--------|-----------------------------------------------------------|------------------|
//! | BROKER | everything except `SUBMIT_DOCUMENTS`                      | ceiling          |
//! | CLIENT | view transaction/documents, submit, search criteria, conditions | ceiling minus `EDIT_CONDITIONS` |
//!
//! Explicit grants never exceed the ceiling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tmx_core::{Timestamp, TransactionId, UserId};

use crate::permission::{Permission, PermissionSet};

// ─── Roles ───────────────────────────────────────────────────────────

/// Platform role carried by the caller's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Admin,
    Broker,
    Client,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Broker => "BROKER",
            Self::Client => "CLIENT",
        }
    }

    /// Whether this role may open new transactions.
    pub fn can_open_transactions(&self) -> bool {
        matches!(self, Self::Admin | Self::Broker)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "broker" => Ok(Self::Broker),
            "client" => Ok(Self::Client),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Role of a participant on one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    /// Broker side: the owning broker and assisting brokers.
    Broker,
    /// Client side: the represented client and co-clients.
    Client,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broker => "BROKER",
            Self::Client => "CLIENT",
        }
    }

    /// The most a participant with this role can ever hold.
    pub fn ceiling(&self) -> PermissionSet {
        match self {
            Self::Broker => Permission::ALL
                .into_iter()
                .filter(|p| *p != Permission::SubmitDocuments)
                .collect(),
            Self::Client => PermissionSet::from([
                Permission::ViewTransaction,
                Permission::ViewDocuments,
                Permission::SubmitDocuments,
                Permission::EditSearchCriteria,
                Permission::EditConditions,
            ]),
        }
    }

    /// What a participant holds when no explicit grants are recorded.
    pub fn default_permissions(&self) -> PermissionSet {
        let mut set = self.ceiling();
        if *self == Self::Client {
            set.remove(Permission::EditConditions);
        }
        set
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Actor context ───────────────────────────────────────────────────

/// The authenticated caller of a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_id: UserId,
    pub role: ActorRole,
    /// The transaction the caller is acting on. Operations on a transaction
    /// require this to match it; opening a transaction does not.
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
}

impl ActorContext {
    pub fn new(actor_id: UserId, role: ActorRole) -> Self {
        Self {
            actor_id,
            role,
            transaction_id: None,
        }
    }

    /// Scope the context to a transaction.
    pub fn for_transaction(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

// ─── Participant ─────────────────────────────────────────────────────

/// A user's membership on one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    /// Explicit grants; `None` means the role defaults.
    #[serde(default)]
    pub grants: Option<PermissionSet>,
    pub added_at: Timestamp,
}

impl Participant {
    pub fn new(transaction_id: TransactionId, user_id: UserId, role: ParticipantRole) -> Self {
        Self {
            transaction_id,
            user_id,
            role,
            grants: None,
            added_at: Timestamp::now(),
        }
    }

    pub fn with_grants(mut self, grants: PermissionSet) -> Self {
        self.grants = Some(grants);
        self
    }

    /// Grants capped by the role ceiling, or the role defaults.
    pub fn permissions(&self) -> PermissionSet {
        match &self.grants {
            Some(grants) => grants.intersection(&self.role.ceiling()),
            None => self.role.default_permissions(),
        }
    }
}
