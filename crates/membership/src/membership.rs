//! Membership records: the entitlement a user holds through an organisation.
//!
//! # Invariants
//! - At most one membership per user has `is_active == true`. Writers must
//!   upsert the existing active row, never insert blindly.
//! - A membership always references an organisation.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use guildhall_core::{
    DomainError, DomainResult, Entity, MembershipId, OrganisationId, UserId, parse_uk_date_opt,
};

use crate::tier::{TierCatalog, TierKey, TierRank};

/// Free-text membership status, conventionally `active` or `suspended`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipStatus(String);

impl MembershipStatus {
    pub const ACTIVE: &'static str = "active";
    pub const SUSPENDED: &'static str = "suspended";

    /// Blank input falls back to `active`.
    pub fn new(raw: &str) -> Self {
        match raw.trim() {
            "" => Self::active(),
            s => Self(s.to_string()),
        }
    }

    pub fn active() -> Self {
        Self(Self::ACTIVE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_suspended(&self) -> bool {
        self.0 == Self::SUSPENDED
    }
}

impl Default for MembershipStatus {
    fn default() -> Self {
        Self::active()
    }
}

impl core::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw membership fields as submitted by an editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipForm {
    pub tier: Option<TierKey>,
    pub status: Option<String>,
    pub manager_name: Option<String>,
    /// `dd/mm/yyyy`, blank for no expiry.
    pub expiry_text: Option<String>,
    /// Derived from the status when omitted.
    pub is_active: Option<bool>,
}

/// Validated membership fields, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTerms {
    pub tier: TierKey,
    pub status: MembershipStatus,
    pub manager_name: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub is_active: bool,
}

impl MembershipTerms {
    pub fn new(tier: TierKey) -> Self {
        Self {
            tier,
            status: MembershipStatus::active(),
            manager_name: None,
            expiry: None,
            is_active: true,
        }
    }

    /// Validate a form. The tier is required; the expiry must be a real date.
    pub fn from_form(form: &MembershipForm) -> DomainResult<Self> {
        let tier = form
            .tier
            .ok_or_else(|| DomainError::validation("A membership tier is required."))?;
        let status = MembershipStatus::new(form.status.as_deref().unwrap_or_default());
        let expiry = parse_uk_date_opt(form.expiry_text.as_deref())?;
        let manager_name = form
            .manager_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let is_active = form.is_active.unwrap_or(!status.is_suspended());

        Ok(Self {
            tier,
            status,
            manager_name,
            expiry,
            is_active,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub organisation_id: OrganisationId,
    pub tier: TierKey,
    pub status: MembershipStatus,
    pub is_active: bool,
    pub expiry: Option<NaiveDate>,
    pub manager_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn create(
        user_id: UserId,
        organisation_id: OrganisationId,
        terms: MembershipTerms,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MembershipId::new(),
            user_id,
            organisation_id,
            tier: terms.tier,
            status: terms.status,
            is_active: terms.is_active,
            expiry: terms.expiry,
            manager_name: terms.manager_name,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the editable fields in place.
    pub fn apply(&mut self, organisation_id: OrganisationId, terms: MembershipTerms, now: DateTime<Utc>) {
        self.organisation_id = organisation_id;
        self.tier = terms.tier;
        self.status = terms.status;
        self.is_active = terms.is_active;
        self.expiry = terms.expiry;
        self.manager_name = terms.manager_name;
        self.updated_at = now;
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }
}

impl Entity for Membership {
    type Id = MembershipId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Pick "the" active membership among a user's rows.
///
/// Normally there is at most one. If the invariant has been broken, the
/// highest-ranked row wins; equal ranks fall back to the smallest id so the
/// choice is deterministic. Rows whose tier is missing from the catalog are
/// ignored.
pub fn select_active<'a>(memberships: &'a [Membership], tiers: &TierCatalog) -> Option<(&'a Membership, TierRank)> {
    memberships
        .iter()
        .filter(|m| m.is_active)
        .filter_map(|m| tiers.rank(m.tier).map(|rank| (m, rank)))
        .max_by_key(|(m, rank)| (*rank, Reverse(m.id)))
}

/// Users holding more than one active membership, with their active count.
pub fn active_membership_violations(memberships: &[Membership]) -> Vec<(UserId, usize)> {
    let mut counts: BTreeMap<UserId, usize> = BTreeMap::new();
    for m in memberships.iter().filter(|m| m.is_active) {
        *counts.entry(m.user_id).or_default() += 1;
    }
    counts.into_iter().filter(|(_, n)| *n > 1).collect()
}
