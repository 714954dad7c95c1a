//! # Stage Catalog
//!
//! The ordered stage sequence of a transaction, one per side, and the
//! resolution of a transaction's "current stage" to an index in it.
//!
//! ## Sequences
//!
//! ```text
//! BUY_SIDE   PREQUALIFY_FINANCIALLY ─▶ SHOP_FOR_PROPERTY ─▶ SUBMIT_OFFER ─▶ OFFER_ACCEPTED
//!            ─▶ HOME_INSPECTION ─▶ FINANCING_FINALIZED ─▶ NOTARY_SIGNING ─▶ POSSESSION
//!
//! SELL_SIDE  INITIAL_CONSULTATION ─▶ LISTING_PUBLISHED ─▶ REVIEW_OFFERS ─▶ OFFER_ACCEPTED
//!            ─▶ CONDITIONS_SATISFIED ─▶ NOTARY_SIGNING ─▶ HANDOVER_KEYS
//! ```
//!
//! ## Current-stage encodings
//!
//! Records written before stage identifiers existed store the current
//! stage as a 1-based ordinal, sometimes as a JSON number and sometimes as
//! a digit string. Both stay resolvable forever. Identifiers are never
//! renumbered or renamed.
//!
//! The `total_stages` value cached on older records is not trusted; the
//! length of the catalog sequence is authoritative.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tmx_core::Field;

use crate::error::LifecycleError;
use crate::transaction::TransactionStatus;

// ─── Side ────────────────────────────────────────────────────────────

/// Which party the brokerage represents in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionSide {
    /// Representing the buyer.
    BuySide,
    /// Representing the seller.
    SellSide,
}

impl TransactionSide {
    /// Both sides, in display order.
    pub const ALL: [TransactionSide; 2] = [Self::BuySide, Self::SellSide];

    /// The stable upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuySide => "BUY_SIDE",
            Self::SellSide => "SELL_SIDE",
        }
    }
}

impl fmt::Display for TransactionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionSide {
    type Err = StageResolutionError;

    /// Accepts `BUY_SIDE` / `SELL_SIDE` in any case, with `-` or `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "BUY_SIDE" => Ok(Self::BuySide),
            "SELL_SIDE" => Ok(Self::SellSide),
            _ => Err(StageResolutionError::UnknownSide(s.to_string())),
        }
    }
}

// ─── Stage identifiers ───────────────────────────────────────────────

/// Stable identifier of a transaction stage.
///
/// Buy-side identifiers carry the `BUYER_` prefix and sell-side
/// identifiers the `SELLER_` prefix; an identifier belongs to exactly one
/// side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageId {
    BuyerPrequalifyFinancially,
    BuyerShopForProperty,
    BuyerSubmitOffer,
    BuyerOfferAccepted,
    BuyerHomeInspection,
    BuyerFinancingFinalized,
    BuyerNotarySigning,
    BuyerPossession,
    SellerInitialConsultation,
    SellerListingPublished,
    SellerReviewOffers,
    SellerOfferAccepted,
    SellerConditionsSatisfied,
    SellerNotarySigning,
    SellerHandoverKeys,
}

const BUY_SIDE_STAGES: [StageId; 8] = [
    StageId::BuyerPrequalifyFinancially,
    StageId::BuyerShopForProperty,
    StageId::BuyerSubmitOffer,
    StageId::BuyerOfferAccepted,
    StageId::BuyerHomeInspection,
    StageId::BuyerFinancingFinalized,
    StageId::BuyerNotarySigning,
    StageId::BuyerPossession,
];

const SELL_SIDE_STAGES: [StageId; 7] = [
    StageId::SellerInitialConsultation,
    StageId::SellerListingPublished,
    StageId::SellerReviewOffers,
    StageId::SellerOfferAccepted,
    StageId::SellerConditionsSatisfied,
    StageId::SellerNotarySigning,
    StageId::SellerHandoverKeys,
];

impl StageId {
    /// Every stage identifier of both sides.
    pub const ALL: [StageId; 15] = [
        Self::BuyerPrequalifyFinancially,
        Self::BuyerShopForProperty,
        Self::BuyerSubmitOffer,
        Self::BuyerOfferAccepted,
        Self::BuyerHomeInspection,
        Self::BuyerFinancingFinalized,
        Self::BuyerNotarySigning,
        Self::BuyerPossession,
        Self::SellerInitialConsultation,
        Self::SellerListingPublished,
        Self::SellerReviewOffers,
        Self::SellerOfferAccepted,
        Self::SellerConditionsSatisfied,
        Self::SellerNotarySigning,
        Self::SellerHandoverKeys,
    ];

    /// The stable upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyerPrequalifyFinancially => "BUYER_PREQUALIFY_FINANCIALLY",
            Self::BuyerShopForProperty => "BUYER_SHOP_FOR_PROPERTY",
            Self::BuyerSubmitOffer => "BUYER_SUBMIT_OFFER",
            Self::BuyerOfferAccepted => "BUYER_OFFER_ACCEPTED",
            Self::BuyerHomeInspection => "BUYER_HOME_INSPECTION",
            Self::BuyerFinancingFinalized => "BUYER_FINANCING_FINALIZED",
            Self::BuyerNotarySigning => "BUYER_NOTARY_SIGNING",
            Self::BuyerPossession => "BUYER_POSSESSION",
            Self::SellerInitialConsultation => "SELLER_INITIAL_CONSULTATION",
            Self::SellerListingPublished => "SELLER_LISTING_PUBLISHED",
            Self::SellerReviewOffers => "SELLER_REVIEW_OFFERS",
            Self::SellerOfferAccepted => "SELLER_OFFER_ACCEPTED",
            Self::SellerConditionsSatisfied => "SELLER_CONDITIONS_SATISFIED",
            Self::SellerNotarySigning => "SELLER_NOTARY_SIGNING",
            Self::SellerHandoverKeys => "SELLER_HANDOVER_KEYS",
        }
    }

    /// The side whose sequence contains this stage.
    pub fn side(&self) -> TransactionSide {
        if BUY_SIDE_STAGES.contains(self) {
            TransactionSide::BuySide
        } else {
            TransactionSide::SellSide
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = StageResolutionError;

    /// Parses the wire name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| StageResolutionError::Unrecognized(s.to_string()))
    }
}

impl From<StageId> for StageRef {
    fn from(id: StageId) -> Self {
        StageRef::Named(id.as_str().to_string())
    }
}

// ─── Stage reference ─────────────────────────────────────────────────

/// A stored "current stage" value as found on a transaction record.
///
/// Deserializes untagged: a JSON number becomes [`StageRef::Ordinal`], a
/// JSON string becomes [`StageRef::Named`]. A named value made only of
/// ASCII digits is a legacy ordinal written as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageRef {
    /// Legacy 1-based stage number.
    Ordinal(i64),
    /// Stage identifier (or a legacy ordinal stored as text).
    Named(String),
}

impl fmt::Display for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinal(n) => write!(f, "{n}"),
            Self::Named(s) => f.write_str(s),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Failure to resolve a stored current stage to a catalog position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageResolutionError {
    /// The value is neither a known identifier nor a numeric ordinal.
    #[error("unrecognized stage \"{0}\"")]
    Unrecognized(String),

    /// The identifier is valid but belongs to the other side's sequence.
    #[error("stage {stage} is not part of this stage sequence")]
    NotInSequence {
        /// The identifier that was found.
        stage: StageId,
    },

    /// The sequence to resolve against is empty.
    #[error("stage sequence is empty")]
    EmptySequence,

    /// The side name is not recognized.
    #[error("unknown transaction side \"{0}\"")]
    UnknownSide(String),
}

// ─── Catalog operations ──────────────────────────────────────────────

/// The ordered stage sequence for a side.
pub fn stages_for_side(side: TransactionSide) -> &'static [StageId] {
    match side {
        TransactionSide::BuySide => &BUY_SIDE_STAGES,
        TransactionSide::SellSide => &SELL_SIDE_STAGES,
    }
}

/// Field-level rejection when `stage` belongs to the other side.
pub(crate) fn ensure_stage_on_side(
    stage: StageId,
    side: TransactionSide,
) -> Result<(), LifecycleError> {
    if stage.side() != side {
        return Err(LifecycleError::field(
            Field::Stage,
            format!("stage {stage} is not part of the {side} sequence"),
        ));
    }
    Ok(())
}

/// Resolve a stored current stage to its index in `stages`.
///
/// - A recognized identifier resolves to its position.
/// - A 1-based ordinal `n` resolves to `n - 1`, clamped to
///   `[0, stages.len() - 1]`.
/// - Anything else is a [`StageResolutionError`]; the caller picks the
///   fallback (see [`resolve_stage_index_or_first`]).
pub fn resolve_stage_index(
    current: &StageRef,
    stages: &[StageId],
) -> Result<usize, StageResolutionError> {
    if stages.is_empty() {
        return Err(StageResolutionError::EmptySequence);
    }
    match current {
        StageRef::Ordinal(n) => Ok(clamp_ordinal(*n, stages.len())),
        StageRef::Named(raw) => {
            let trimmed = raw.trim();
            if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                // Digit strings too long for i64 are past the end anyway.
                let n = trimmed.parse::<i64>().unwrap_or(i64::MAX);
                return Ok(clamp_ordinal(n, stages.len()));
            }
            let stage: StageId = trimmed
                .parse()
                .map_err(|_| StageResolutionError::Unrecognized(raw.clone()))?;
            stages
                .iter()
                .position(|s| *s == stage)
                .ok_or(StageResolutionError::NotInSequence { stage })
        }
    }
}

/// [`resolve_stage_index`] with the conventional fallback to the first
/// stage when the stored value is unresolvable.
pub fn resolve_stage_index_or_first(current: &StageRef, stages: &[StageId]) -> usize {
    resolve_stage_index(current, stages).unwrap_or(0)
}

/// Whether a transaction is at its terminal stage or in a terminal status.
///
/// An unresolvable current stage is never terminal by position; only the
/// status can make it terminal.
pub fn is_terminated_stage(
    current: &StageRef,
    stages: &[StageId],
    status: TransactionStatus,
) -> bool {
    if status.is_terminal() {
        return true;
    }
    match resolve_stage_index(current, stages) {
        Ok(index) => index + 1 == stages.len(),
        Err(_) => false,
    }
}

fn clamp_ordinal(n: i64, len: usize) -> usize {
    let last = len - 1;
    if n <= 1 {
        return 0;
    }
    usize::try_from(n - 1).map_or(last, |index| index.min(last))
}

// ─── Resolved read model ─────────────────────────────────────────────

/// The current stage of a transaction, resolved against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStage {
    /// Zero-based position in the side's sequence.
    pub index: usize,
    /// The stage at that position.
    pub stage: StageId,
    /// Length of the side's sequence (authoritative total).
    pub total: usize,
    /// Whether the transaction is at its last stage or terminal status.
    pub is_terminated: bool,
}

impl ResolvedStage {
    /// Resolve `current` for `side`, failing on unresolvable values.
    pub fn resolve(
        side: TransactionSide,
        current: &StageRef,
        status: TransactionStatus,
    ) -> Result<Self, StageResolutionError> {
        let stages = stages_for_side(side);
        let index = resolve_stage_index(current, stages)?;
        Ok(Self {
            index,
            stage: stages[index],
            total: stages.len(),
            is_terminated: status.is_terminal() || index + 1 == stages.len(),
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn side() -> impl Strategy<Value = TransactionSide> {
        prop_oneof![Just(TransactionSide::BuySide), Just(TransactionSide::SellSide)]
    }

    proptest! {
        /// Every in-range ordinal n resolves to n - 1.
        #[test]
        fn ordinal_in_range_resolves_to_n_minus_one(side in side(), seed in 0usize..64) {
            let stages = stages_for_side(side);
            let n = seed % stages.len() + 1;
            prop_assert_eq!(
                resolve_stage_index(&StageRef::Ordinal(n as i64), stages),
                Ok(n - 1)
            );
            prop_assert_eq!(
                resolve_stage_index(&StageRef::Named(n.to_string()), stages),
                Ok(n - 1)
            );
        }

        /// Any integer resolves inside [0, len).
        #[test]
        fn any_ordinal_resolves_in_bounds(side in side(), n in any::<i64>()) {
            let stages = stages_for_side(side);
            let index = resolve_stage_index(&StageRef::Ordinal(n), stages).unwrap();
            prop_assert!(index < stages.len());
        }

        /// Terminal detection agrees with the resolved index.
        #[test]
        fn terminated_iff_last_index(side in side(), n in -5i64..20) {
            let stages = stages_for_side(side);
            let current = StageRef::Ordinal(n);
            let index = resolve_stage_index(&current, stages).unwrap();
            prop_assert_eq!(
                is_terminated_stage(&current, stages, TransactionStatus::Active),
                index == stages.len() - 1
            );
            prop_assert!(is_terminated_stage(&current, stages, TransactionStatus::ClosedSuccessfully));
        }
    }
}
