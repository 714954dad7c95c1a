//! # tmx-access — Participants and Permissions
//!
//! Who may do what on a brokerage transaction. Pure functions over the
//! transaction record, its participant list, and the caller's
//! [`ActorContext`]; no storage and no I/O.
//!
//! - `permission.rs`: the closed [`Permission`] set and [`PermissionSet`].
//! - `participant.rs`: platform roles, participant roles with their
//!   ceilings and defaults, the actor context.
//! - `gate.rs`: [`PermissionGate`], the single place permissions are
//!   resolved, including the archived-transaction override.

pub mod gate;
pub mod participant;
pub mod permission;

pub use gate::{
    authorize_open, check_permission, require_draft_owner, AccessDenied, DenialReason,
    EffectiveRole, PermissionGate,
};
pub use participant::{ActorContext, ActorRole, Participant, ParticipantRole};
pub use permission::{Permission, PermissionSet, UnknownPermission};
