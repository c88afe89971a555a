use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use guildhall_auth::{AdminAction, Principal, require_admin};
use guildhall_core::{DomainError, DomainResult, MembershipId, OrganisationId, UserId};
use guildhall_membership::{
    Membership, MembershipForm, MembershipTerms, active_membership_violations, select_active,
};

use crate::store::{Directory, DirectoryTx, in_transaction};

/// Keeps at most one active membership per user.
pub struct MembershipManager<D> {
    directory: D,
}

impl<D> MembershipManager<D>
where
    D: Directory,
{
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Create or update the user's single active membership.
    ///
    /// The membership belongs to `organisation_id` when given, otherwise to
    /// the user's own organisation; either way the user must already have an
    /// organisation.
    pub fn upsert_membership(
        &self,
        principal: &Principal,
        user_id: UserId,
        organisation_id: Option<OrganisationId>,
        form: &MembershipForm,
    ) -> DomainResult<Membership> {
        require_admin(principal, AdminAction::ManageMembership)?;
        let terms = MembershipTerms::from_form(form)?;
        in_transaction(&self.directory, |tx| {
            upsert_in(tx, user_id, organisation_id, terms, Utc::now())
        })
    }

    /// Deactivate (but keep) the user's active membership.
    pub fn deactivate(&self, principal: &Principal, user_id: UserId) -> DomainResult<Vec<Membership>> {
        require_admin(principal, AdminAction::ManageMembership)?;
        in_transaction(&self.directory, |tx| {
            if tx.user(user_id)?.is_none() {
                return Err(DomainError::not_found(format!("user {user_id}")));
            }
            deactivate_in(tx, user_id, Utc::now())
        })
    }

    pub fn active_membership(&self, user_id: UserId) -> DomainResult<Option<Membership>> {
        let tx = self.directory.begin()?;
        let tiers = tx.tiers()?;
        Ok(super::active_membership(tx.as_ref(), user_id, &tiers)?.map(|(m, _)| m))
    }

    /// Scan the whole membership table for broken invariants.
    pub fn consistency_report(&self) -> DomainResult<ConsistencyReport> {
        let tx = self.directory.begin()?;
        let memberships = tx.memberships()?;
        let mut orphaned = Vec::new();
        for m in &memberships {
            if tx.user(m.user_id)?.is_none() || tx.organisation(m.organisation_id)?.is_none() {
                orphaned.push(m.id);
            }
        }
        let report = ConsistencyReport {
            multiple_active: active_membership_violations(&memberships),
            orphaned_memberships: orphaned,
        };
        if !report.is_consistent() {
            warn!(
                multiple_active = report.multiple_active.len(),
                orphaned = report.orphaned_memberships.len(),
                "membership table is inconsistent"
            );
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Users with more than one active membership, with the count.
    pub multiple_active: Vec<(UserId, usize)>,
    /// Memberships whose user or organisation no longer exists.
    pub orphaned_memberships: Vec<MembershipId>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.multiple_active.is_empty() && self.orphaned_memberships.is_empty()
    }
}

/// Upsert by user inside an open transaction. Never inserts blindly.
pub(crate) fn upsert_in(
    tx: &mut dyn DirectoryTx,
    user_id: UserId,
    organisation_id: Option<OrganisationId>,
    terms: MembershipTerms,
    now: DateTime<Utc>,
) -> DomainResult<Membership> {
    let user = tx
        .user(user_id)?
        .ok_or_else(|| DomainError::not_found(format!("user {user_id}")))?;
    let user_org = user.organisation_id.ok_or_else(|| {
        DomainError::validation("To assign a membership tier, the user must have an organisation set.")
    })?;
    let organisation_id = organisation_id.unwrap_or(user_org);
    if tx.organisation(organisation_id)?.is_none() {
        return Err(DomainError::not_found(format!("organisation {organisation_id}")));
    }
    let tiers = tx.tiers()?;
    if tiers.get(terms.tier).is_none() {
        return Err(DomainError::not_found(format!("membership tier {}", terms.tier)));
    }

    let existing = tx.memberships_for_user(user_id)?;
    let membership = match select_active(&existing, &tiers) {
        Some((current, _)) => {
            let mut updated = current.clone();
            updated.apply(organisation_id, terms, now);
            // Repair any extra active rows left by an earlier broken write.
            for stray in existing.iter().filter(|m| m.is_active && m.id != updated.id) {
                warn!(%user_id, membership_id = %stray.id, "deactivating duplicate active membership");
                let mut stray = stray.clone();
                stray.deactivate(now);
                tx.update_membership(stray)?;
            }
            tx.update_membership(updated.clone())?;
            updated
        }
        None => {
            let created = Membership::create(user_id, organisation_id, terms, now);
            tx.insert_membership(created.clone())?;
            created
        }
    };

    info!(
        %user_id,
        membership_id = %membership.id,
        tier = %membership.tier,
        is_active = membership.is_active,
        "membership saved"
    );
    Ok(membership)
}

/// Deactivate every active membership of the user; returns the rows changed.
pub(crate) fn deactivate_in(
    tx: &mut dyn DirectoryTx,
    user_id: UserId,
    now: DateTime<Utc>,
) -> DomainResult<Vec<Membership>> {
    let mut changed = Vec::new();
    for mut m in tx.memberships_for_user(user_id)?.into_iter().filter(|m| m.is_active) {
        m.deactivate(now);
        tx.update_membership(m.clone())?;
        changed.push(m);
    }
    if !changed.is_empty() {
        info!(%user_id, count = changed.len(), "membership deactivated");
    }
    Ok(changed)
}
