//! Tier ranking model.
//!
//! Ranks are the single comparable quantity for every access decision:
//! "tier X or above" always reduces to `candidate_rank >= required_rank`.
//! Never compare tiers by key or label.

use core::str::FromStr;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use guildhall_core::{DomainError, DomainResult, ValueObject};

/// Key of a membership tier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierKey {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl TierKey {
    pub const ALL: [TierKey; 4] = [TierKey::Bronze, TierKey::Silver, TierKey::Gold, TierKey::Platinum];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierKey::Bronze => "BRONZE",
            TierKey::Silver => "SILVER",
            TierKey::Gold => "GOLD",
            TierKey::Platinum => "PLATINUM",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TierKey::Bronze => "Bronze",
            TierKey::Silver => "Silver",
            TierKey::Gold => "Gold",
            TierKey::Platinum => "Platinum",
        }
    }

    /// Rank in the standard seeded tier table.
    pub fn standard_rank(&self) -> TierRank {
        match self {
            TierKey::Bronze => TierRank(1),
            TierKey::Silver => TierRank(2),
            TierKey::Gold => TierRank(3),
            TierKey::Platinum => TierRank(4),
        }
    }
}

impl core::fmt::Display for TierKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierKey {
    type Err = DomainError;

    /// Case-insensitive (`"silver"`, `"SILVER"` and `"Silver"` all parse).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRONZE" => Ok(TierKey::Bronze),
            "SILVER" => Ok(TierKey::Silver),
            "GOLD" => Ok(TierKey::Gold),
            "PLATINUM" => Ok(TierKey::Platinum),
            other => Err(DomainError::validation(format!("unknown membership tier '{other}'"))),
        }
    }
}

/// Integer rank of a tier; strictly increasing with tier level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierRank(u32);

impl TierRank {
    pub fn new(rank: u32) -> Self {
        Self(rank)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// `true` when a member at this rank satisfies a `required` minimum.
    pub fn satisfies(&self, required: TierRank) -> bool {
        *self >= required
    }
}

impl ValueObject for TierRank {}

impl core::fmt::Display for TierRank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A seeded tier row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTier {
    pub key: TierKey,
    pub label: String,
    pub rank: TierRank,
}

impl MembershipTier {
    pub fn new(key: TierKey, label: impl Into<String>, rank: TierRank) -> Self {
        Self {
            key,
            label: label.into(),
            rank,
        }
    }
}

/// The seeded tier table, ordered by rank.
///
/// # Invariants
/// - Keys are unique.
/// - Ranks are unique (total order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierCatalog {
    tiers: Vec<MembershipTier>,
}

impl TierCatalog {
    pub fn new(mut tiers: Vec<MembershipTier>) -> DomainResult<Self> {
        let mut keys = HashSet::new();
        let mut ranks = HashSet::new();
        for tier in &tiers {
            if !keys.insert(tier.key) {
                return Err(DomainError::validation(format!("duplicate tier key {}", tier.key)));
            }
            if !ranks.insert(tier.rank) {
                return Err(DomainError::validation(format!(
                    "tier {} shares rank {} with another tier",
                    tier.key, tier.rank
                )));
            }
        }
        tiers.sort_by_key(|t| t.rank);
        Ok(Self { tiers })
    }

    /// Bronze(1) < Silver(2) < Gold(3) < Platinum(4).
    pub fn standard() -> Self {
        Self {
            tiers: TierKey::ALL
                .iter()
                .map(|k| MembershipTier::new(*k, k.label(), k.standard_rank()))
                .collect(),
        }
    }

    pub fn get(&self, key: TierKey) -> Option<&MembershipTier> {
        self.tiers.iter().find(|t| t.key == key)
    }

    pub fn rank(&self, key: TierKey) -> Option<TierRank> {
        self.get(key).map(|t| t.rank)
    }

    /// Tiers in ascending rank order.
    pub fn iter(&self) -> impl Iterator<Item = &MembershipTier> {
        self.tiers.iter()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
