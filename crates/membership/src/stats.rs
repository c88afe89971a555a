//! Admin dashboard statistics over active memberships.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use guildhall_core::UserId;

use crate::benefit::{BenefitCatalog, BenefitId};
use crate::tier::{TierCatalog, TierKey, TierRank};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSummary {
    pub key: TierKey,
    pub label: String,
    pub rank: TierRank,
    pub count: usize,
}

/// Active member counts per tier, in ascending rank order.
///
/// `active_tiers` holds one entry per active membership to count; callers
/// restrict it to MEMBER role holders.
pub fn tier_summaries(tiers: &TierCatalog, active_tiers: &[TierKey]) -> Vec<TierSummary> {
    tiers
        .iter()
        .map(|tier| TierSummary {
            key: tier.key,
            label: tier.label.clone(),
            rank: tier.rank,
            count: active_tiers.iter().filter(|k| **k == tier.key).count(),
        })
        .collect()
}

/// Annual membership fee per tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPricing {
    prices: HashMap<TierKey, u64>,
}

impl TierPricing {
    pub fn new(prices: HashMap<TierKey, u64>) -> Self {
        Self { prices }
    }

    /// Bronze is free; silver 5 000, gold 15 000, platinum 30 000.
    pub fn standard() -> Self {
        Self::new(HashMap::from([
            (TierKey::Bronze, 0),
            (TierKey::Silver, 5_000),
            (TierKey::Gold, 15_000),
            (TierKey::Platinum, 30_000),
        ]))
    }

    pub fn price(&self, tier: TierKey) -> u64 {
        self.prices.get(&tier).copied().unwrap_or(0)
    }

    pub fn annual_revenue(&self, summaries: &[TierSummary]) -> u64 {
        summaries
            .iter()
            .map(|s| self.price(s.key) * s.count as u64)
            .sum()
    }
}

impl Default for TierPricing {
    fn default() -> Self {
        Self::standard()
    }
}

/// One active member as seen by the redemption statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRedemptions {
    pub user_id: UserId,
    pub rank: TierRank,
    pub redeemed: BTreeSet<BenefitId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenefitRedemptionStat {
    pub benefit_id: BenefitId,
    pub eligible: usize,
    pub redeemed: usize,
    /// Rounded percentage of eligible members who redeemed; `None` when nobody is eligible.
    pub percent: Option<u32>,
}

pub fn benefit_redemption_stats(
    catalog: &BenefitCatalog,
    tiers: &TierCatalog,
    members: &[MemberRedemptions],
) -> Vec<BenefitRedemptionStat> {
    catalog
        .iter()
        .map(|benefit| {
            let eligible: Vec<&MemberRedemptions> = match tiers.rank(benefit.tier_min) {
                Some(min) => members.iter().filter(|m| m.rank.satisfies(min)).collect(),
                None => Vec::new(),
            };
            let redeemed = eligible.iter().filter(|m| m.redeemed.contains(&benefit.id)).count();
            BenefitRedemptionStat {
                benefit_id: benefit.id.clone(),
                eligible: eligible.len(),
                redeemed,
                percent: rounded_percent(redeemed, eligible.len()),
            }
        })
        .collect()
}

fn rounded_percent(part: usize, whole: usize) -> Option<u32> {
    if whole == 0 {
        return None;
    }
    // Round half up.
    Some(((part * 200 + whole) / (whole * 2)) as u32)
}

/// Most redeemed benefit: highest percentage, then highest redeemed count.
///
/// Benefits nobody is eligible for are skipped; ties keep catalog order.
pub fn top_benefit(stats: &[BenefitRedemptionStat]) -> Option<&BenefitRedemptionStat> {
    stats
        .iter()
        .filter(|s| s.eligible > 0)
        .fold(None, |best: Option<&BenefitRedemptionStat>, s| match best {
            Some(b) if (b.percent, b.redeemed) >= (s.percent, s.redeemed) => Some(b),
            _ => Some(s),
        })
}
