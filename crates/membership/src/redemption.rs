//! Per-user redemption records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guildhall_core::{Entity, MembershipId, RedemptionId, UserId};

use crate::benefit::BenefitId;
use crate::organisation::Slug;

/// The set of benefit ids a member has redeemed.
///
/// Authority is the `user_id` link; `membership_id` is a denormalised pointer
/// to whatever membership was active when the record was first written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub id: RedemptionId,
    pub user_id: UserId,
    pub membership_id: Option<MembershipId>,
    pub member_key: String,
    pub benefits: BTreeSet<BenefitId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RedemptionRecord {
    pub fn new(
        user_id: UserId,
        membership_id: Option<MembershipId>,
        organisation_slug: Option<&Slug>,
        benefits: BTreeSet<BenefitId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RedemptionId::new(),
            user_id,
            membership_id,
            member_key: member_key(organisation_slug, user_id),
            benefits,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full replace of the redeemed set.
    pub fn replace(&mut self, benefits: BTreeSet<BenefitId>, now: DateTime<Utc>) {
        self.benefits = benefits;
        self.updated_at = now;
    }
}

impl Entity for RedemptionRecord {
    type Id = RedemptionId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Organisation slug when there is one, else `user-` + 12 chars of the user id.
pub fn member_key(organisation_slug: Option<&Slug>, user_id: UserId) -> String {
    match organisation_slug {
        Some(slug) => slug.to_string(),
        None => {
            let id = user_id.to_string();
            format!("user-{}", &id[..12.min(id.len())])
        }
    }
}
