//! Benefit eligibility and the member's effective benefit list.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::benefit::{Benefit, BenefitCatalog, BenefitId};
use crate::tier::{TierCatalog, TierKey, TierRank};

/// `true` iff there is a member rank and it meets the benefit's minimum tier.
///
/// A tier missing from the catalog never grants access.
pub fn can_access_benefit(member_rank: Option<TierRank>, tier_min: TierKey, tiers: &TierCatalog) -> bool {
    match (member_rank, tiers.rank(tier_min)) {
        (Some(rank), Some(required)) => rank.satisfies(required),
        _ => false,
    }
}

/// Per-member state of a benefit. The three states are mutually exclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BenefitState {
    /// The member's tier does not reach the benefit (or there is no membership).
    Locked,
    /// Included in the member's tier, not yet redeemed.
    Available,
    /// Included in the member's tier and present in the redemption set.
    Redeemed,
}

/// Locked does not look at the redemption set: a redeemed benefit that a
/// downgrade put out of reach reads as locked.
pub fn benefit_state(qualifies: bool, redeemed: bool) -> BenefitState {
    match (qualifies, redeemed) {
        (false, _) => BenefitState::Locked,
        (true, true) => BenefitState::Redeemed,
        (true, false) => BenefitState::Available,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveBenefit<'a> {
    pub benefit: &'a Benefit,
    pub state: BenefitState,
}

/// The catalog as one member sees it.
///
/// Benefits superseded by a higher benefit the member qualifies for are
/// removed entirely; every remaining benefit is tagged with its state.
pub fn effective_benefits<'a>(
    catalog: &'a BenefitCatalog,
    tiers: &TierCatalog,
    member_rank: Option<TierRank>,
    redeemed: &BTreeSet<BenefitId>,
) -> Vec<EffectiveBenefit<'a>> {
    let superseded: BTreeSet<&BenefitId> = catalog
        .iter()
        .filter(|b| !b.supersedes.is_empty())
        .filter(|b| can_access_benefit(member_rank, b.tier_min, tiers))
        .flat_map(|b| b.supersedes.iter())
        .collect();

    catalog
        .iter()
        .filter(|b| !superseded.contains(&b.id))
        .map(|benefit| {
            let qualifies = can_access_benefit(member_rank, benefit.tier_min, tiers);
            EffectiveBenefit {
                benefit,
                state: benefit_state(qualifies, redeemed.contains(&benefit.id)),
            }
        })
        .collect()
}

/// Number of effective benefits in each state.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BenefitCounts {
    pub redeemed: usize,
    pub available: usize,
    pub locked: usize,
}

impl BenefitCounts {
    pub fn tally(rows: &[EffectiveBenefit<'_>]) -> Self {
        rows.iter().fold(Self::default(), |mut c, row| {
            match row.state {
                BenefitState::Redeemed => c.redeemed += 1,
                BenefitState::Available => c.available += 1,
                BenefitState::Locked => c.locked += 1,
            }
            c
        })
    }
}
