use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use guildhall_auth::{AdminAction, Principal, require_admin};
use guildhall_core::{DomainError, DomainResult, UserId};
use guildhall_membership::{BenefitCatalog, BenefitId, RedemptionRecord};

use super::active_membership;
use crate::store::{Directory, in_transaction};

/// Per-user redeemed benefit sets.
pub struct RedemptionTracker<D> {
    directory: D,
    catalog: Arc<BenefitCatalog>,
}

impl<D> RedemptionTracker<D>
where
    D: Directory,
{
    pub fn new(directory: D, catalog: Arc<BenefitCatalog>) -> Self {
        Self { directory, catalog }
    }

    /// Replace the user's redeemed set with `codes`.
    ///
    /// Every code must be in the catalog. The record is created on first
    /// write, linked to the active membership at that moment.
    pub fn set_redeemed_benefits<I, S>(
        &self,
        principal: &Principal,
        user_id: UserId,
        codes: I,
    ) -> DomainResult<BTreeSet<BenefitId>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        require_admin(principal, AdminAction::SetRedemptions)?;
        let benefits = self.catalog.validate_codes(codes)?;

        in_transaction(&self.directory, |tx| {
            let user = tx
                .user(user_id)?
                .ok_or_else(|| DomainError::not_found(format!("user {user_id}")))?;
            let now = Utc::now();
            let record = match tx.redemption(user_id)? {
                Some(mut existing) => {
                    existing.replace(benefits.clone(), now);
                    existing
                }
                None => {
                    let tiers = tx.tiers()?;
                    let membership_id = active_membership(tx, user_id, &tiers)?.map(|(m, _)| m.id);
                    let slug = match user.organisation_id {
                        Some(id) => tx.organisation(id)?.map(|o| o.slug),
                        None => None,
                    };
                    RedemptionRecord::new(user_id, membership_id, slug.as_ref(), benefits.clone(), now)
                }
            };
            tx.upsert_redemption(record)?;
            info!(%user_id, redeemed = benefits.len(), "redeemed benefits saved");
            Ok(benefits)
        })
    }

    /// Empty when nothing was ever recorded.
    pub fn get_redeemed_benefits(&self, user_id: UserId) -> DomainResult<BTreeSet<BenefitId>> {
        let tx = self.directory.begin()?;
        Ok(tx.redemption(user_id)?.map(|r| r.benefits).unwrap_or_default())
    }
}
