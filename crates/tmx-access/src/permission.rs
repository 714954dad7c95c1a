//! # Permissions
//!
//! The closed set of named capabilities a participant can hold on a
//! transaction. Names are stable upper-case strings; adding a permission
//! is a versioned change of the wire contract.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named capability on one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ViewTransaction,
    EditTransaction,
    EditStage,
    ViewDocuments,
    EditDocuments,
    ReviewDocuments,
    SubmitDocuments,
    EditConditions,
    EditSearchCriteria,
    ManageParticipants,
}

impl Permission {
    pub const ALL: [Permission; 10] = [
        Self::ViewTransaction,
        Self::EditTransaction,
        Self::EditStage,
        Self::ViewDocuments,
        Self::EditDocuments,
        Self::ReviewDocuments,
        Self::SubmitDocuments,
        Self::EditConditions,
        Self::EditSearchCriteria,
        Self::ManageParticipants,
    ];

    /// The stable upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewTransaction => "VIEW_TRANSACTION",
            Self::EditTransaction => "EDIT_TRANSACTION",
            Self::EditStage => "EDIT_STAGE",
            Self::ViewDocuments => "VIEW_DOCUMENTS",
            Self::EditDocuments => "EDIT_DOCUMENTS",
            Self::ReviewDocuments => "REVIEW_DOCUMENTS",
            Self::SubmitDocuments => "SUBMIT_DOCUMENTS",
            Self::EditConditions => "EDIT_CONDITIONS",
            Self::EditSearchCriteria => "EDIT_SEARCH_CRITERIA",
            Self::ManageParticipants => "MANAGE_PARTICIPANTS",
        }
    }

    /// `EDIT_*` permissions, which an archived transaction revokes.
    pub fn is_edit(&self) -> bool {
        self.as_str().starts_with("EDIT_")
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown permission name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown permission \"{0}\"")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

// ─── Permission set ──────────────────────────────────────────────────

/// An ordered set of permissions, serialized as a list of names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn remove(&mut self, permission: Permission) -> bool {
        self.0.remove(&permission)
    }

    pub fn intersection(&self, other: &PermissionSet) -> PermissionSet {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    /// This set with every `EDIT_*` permission removed.
    pub fn without_edits(&self) -> PermissionSet {
        Self(self.0.iter().copied().filter(|p| !p.is_edit()).collect())
    }

    pub fn is_subset(&self, other: &PermissionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSet {
    fn from(permissions: [Permission; N]) -> Self {
        permissions.into_iter().collect()
    }
}
