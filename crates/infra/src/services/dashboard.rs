//! Read models for the admin and member dashboards.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use guildhall_auth::{
    AdminAction, AppKey, Principal, RoleKey, RoleSet, SelfServiceAction, User, require_admin,
    require_self_or_admin,
};
use guildhall_core::{DomainError, DomainResult, OrganisationId, UserId, format_uk_date, index_by_id};
use guildhall_membership::{
    BenefitCatalog, BenefitCounts, BenefitId, BenefitRedemptionStat, BenefitState, EffectiveBenefit,
    MemberRedemptions, Membership, Organisation, TierCatalog, TierKey, TierPricing, TierRank,
    TierSummary, benefit_redemption_stats, benefit_state, can_access_benefit, effective_benefits,
    tier_summaries, top_benefit,
};

use super::active_membership;
use crate::store::{Directory, DirectoryTx};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierView {
    pub key: TierKey,
    pub label: String,
    pub rank: TierRank,
}

impl TierView {
    fn of(key: TierKey, tiers: &TierCatalog) -> Option<Self> {
        tiers.get(key).map(|t| Self {
            key: t.key,
            label: t.label.clone(),
            rank: t.rank,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenefitView {
    pub id: BenefitId,
    pub label: String,
    pub category: &'static str,
    pub tier_min: TierKey,
    pub state: BenefitState,
}

impl From<&EffectiveBenefit<'_>> for BenefitView {
    fn from(row: &EffectiveBenefit<'_>) -> Self {
        Self {
            id: row.benefit.id.clone(),
            label: row.benefit.label.to_string(),
            category: row.benefit.category.label(),
            tier_min: row.benefit.tier_min,
            state: row.state,
        }
    }
}

/// One benefit as a particular member sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenefitDetail {
    pub benefit: BenefitView,
    /// A higher benefit the member qualifies for that replaces this one.
    pub superseded_by: Option<BenefitId>,
}

/// One line of the admin member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRow {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub organisation: Option<String>,
    pub tier: TierView,
    pub status: String,
    /// `dd/mm/yyyy`.
    pub expiry: Option<String>,
    pub redeemed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDetail {
    pub member: MemberRow,
    pub roles: RoleSet,
    pub default_app: Option<AppKey>,
    pub manager_name: Option<String>,
    pub benefits: Vec<BenefitView>,
    pub counts: BenefitCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminDashboard {
    pub tiers: Vec<TierSummary>,
    pub total_members: usize,
    pub annual_revenue: u64,
    pub members: Vec<MemberRow>,
    pub benefit_stats: Vec<BenefitRedemptionStat>,
    pub top_benefit: Option<BenefitRedemptionStat>,
    pub selected: Option<MemberDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDashboard {
    pub user_id: UserId,
    pub name: String,
    pub organisation: Option<String>,
    /// `None` without an active membership.
    pub tier: Option<TierView>,
    pub status: Option<String>,
    pub expiry: Option<String>,
    pub manager_name: Option<String>,
    pub redeemed: BTreeSet<BenefitId>,
    /// Effective benefits, narrowed to `filter` when one was given.
    pub benefits: Vec<BenefitView>,
    pub filter: Option<BenefitState>,
    /// Counts over the unfiltered list.
    pub counts: BenefitCounts,
}

/// A MEMBER role holder with an active membership.
struct ActiveMember {
    user: User,
    membership: Membership,
    rank: TierRank,
    redeemed: BTreeSet<BenefitId>,
}

pub struct DashboardService<D> {
    directory: D,
    benefits: Arc<BenefitCatalog>,
    pricing: TierPricing,
}

impl<D> DashboardService<D>
where
    D: Directory,
{
    pub fn new(directory: D, benefits: Arc<BenefitCatalog>, pricing: TierPricing) -> Self {
        Self {
            directory,
            benefits,
            pricing,
        }
    }

    /// Directory-wide membership statistics plus the detail of one member:
    /// `selected`, or the first in the list when omitted.
    pub fn admin_dashboard(&self, principal: &Principal, selected: Option<UserId>) -> DomainResult<AdminDashboard> {
        require_admin(principal, AdminAction::ViewAdminDashboard)?;
        let tx = self.directory.begin()?;
        let tiers = tx.tiers()?;
        let organisations: BTreeMap<OrganisationId, Organisation> = index_by_id(tx.organisations()?);
        let org_name = |id: OrganisationId| organisations.get(&id).map(|o| o.name.clone());

        let mut members = Vec::new();
        for user_id in tx.holders_of(&RoleKey::Member)? {
            let Some(user) = tx.user(user_id)? else { continue };
            let Some((membership, rank)) = active_membership(&*tx, user_id, &tiers)? else {
                continue;
            };
            let redeemed = tx.redemption(user_id)?.map(|r| r.benefits).unwrap_or_default();
            members.push(ActiveMember {
                user,
                membership,
                rank,
                redeemed,
            });
        }
        members.sort_by_cached_key(|m| {
            (
                Reverse(m.rank),
                org_name(m.membership.organisation_id).map(|n| n.to_lowercase()),
                m.user.display_name().to_lowercase(),
            )
        });

        let active_tiers: Vec<TierKey> = members.iter().map(|m| m.membership.tier).collect();
        let summaries = tier_summaries(&tiers, &active_tiers);
        let redemptions: Vec<MemberRedemptions> = members
            .iter()
            .map(|m| MemberRedemptions {
                user_id: m.user.id,
                rank: m.rank,
                redeemed: m.redeemed.clone(),
            })
            .collect();
        let benefit_stats = benefit_redemption_stats(&self.benefits, &tiers, &redemptions);
        let top = top_benefit(&benefit_stats).cloned();

        let chosen = match selected {
            Some(id) => Some(
                members
                    .iter()
                    .find(|m| m.user.id == id)
                    .ok_or_else(|| DomainError::not_found(format!("member {id}")))?,
            ),
            None => members.first(),
        };
        let selected = match chosen {
            Some(m) => Some(self.member_detail(&*tx, m, &tiers, org_name(m.membership.organisation_id))?),
            None => None,
        };

        let rows = members
            .iter()
            .filter_map(|m| member_row(m, &tiers, org_name(m.membership.organisation_id)))
            .collect();
        debug!(total_members = members.len(), "admin dashboard built");
        Ok(AdminDashboard {
            annual_revenue: self.pricing.annual_revenue(&summaries),
            tiers: summaries,
            total_members: members.len(),
            members: rows,
            benefit_stats,
            top_benefit: top,
            selected,
        })
    }

    /// The member's own view. Admins may open any user's.
    pub fn member_dashboard(
        &self,
        principal: &Principal,
        target: UserId,
        filter: Option<BenefitState>,
    ) -> DomainResult<MemberDashboard> {
        require_self_or_admin(principal, target, SelfServiceAction::ViewMemberDashboard)?;
        let tx = self.directory.begin()?;
        let user = tx
            .user(target)?
            .ok_or_else(|| DomainError::not_found(format!("user {target}")))?;
        let tiers = tx.tiers()?;
        let active = active_membership(&*tx, target, &tiers)?;
        let redeemed = tx.redemption(target)?.map(|r| r.benefits).unwrap_or_default();

        let organisation_id = active
            .as_ref()
            .map(|(m, _)| m.organisation_id)
            .or(user.organisation_id);
        let organisation = match organisation_id {
            Some(id) => tx.organisation(id)?.map(|o| o.name),
            None => None,
        };

        let rank = active.as_ref().map(|(_, rank)| *rank);
        let rows = effective_benefits(&self.benefits, &tiers, rank, &redeemed);
        let counts = BenefitCounts::tally(&rows);
        let benefits = rows
            .iter()
            .filter(|row| filter.is_none_or(|state| row.state == state))
            .map(BenefitView::from)
            .collect();

        let membership = active.map(|(m, _)| m);
        Ok(MemberDashboard {
            user_id: user.id,
            name: user.display_name(),
            organisation,
            tier: membership.as_ref().and_then(|m| TierView::of(m.tier, &tiers)),
            status: membership.as_ref().map(|m| m.status.to_string()),
            expiry: membership.as_ref().and_then(|m| m.expiry).map(format_uk_date),
            manager_name: membership.and_then(|m| m.manager_name),
            redeemed,
            benefits,
            filter,
            counts,
        })
    }

    /// State of a single catalog benefit for `target`.
    pub fn benefit_detail(&self, principal: &Principal, target: UserId, benefit_id: &str) -> DomainResult<BenefitDetail> {
        require_self_or_admin(principal, target, SelfServiceAction::ViewMemberDashboard)?;
        let benefit = self
            .benefits
            .get(benefit_id)
            .ok_or_else(|| DomainError::not_found(format!("benefit {benefit_id}")))?;

        let tx = self.directory.begin()?;
        if tx.user(target)?.is_none() {
            return Err(DomainError::not_found(format!("user {target}")));
        }
        let tiers = tx.tiers()?;
        let rank = active_membership(&*tx, target, &tiers)?.map(|(_, rank)| rank);
        let redeemed = tx
            .redemption(target)?
            .is_some_and(|r| r.benefits.contains(&benefit.id));

        let state = benefit_state(can_access_benefit(rank, benefit.tier_min, &tiers), redeemed);
        let superseded_by = self
            .benefits
            .iter()
            .find(|b| b.supersedes.contains(&benefit.id) && can_access_benefit(rank, b.tier_min, &tiers))
            .map(|b| b.id.clone());

        Ok(BenefitDetail {
            benefit: BenefitView::from(&EffectiveBenefit { benefit, state }),
            superseded_by,
        })
    }

    fn member_detail(
        &self,
        tx: &dyn DirectoryTx,
        member: &ActiveMember,
        tiers: &TierCatalog,
        organisation: Option<String>,
    ) -> DomainResult<MemberDetail> {
        let row = member_row(member, tiers, organisation)
            .ok_or_else(|| DomainError::internal(format!("membership tier {} missing", member.membership.tier)))?;
        let default_app = match member.user.default_app_id {
            Some(id) => tx.app_by_id(id)?.map(|a| a.key),
            None => None,
        };
        let rows = effective_benefits(&self.benefits, tiers, Some(member.rank), &member.redeemed);
        Ok(MemberDetail {
            member: row,
            roles: tx.user_roles(member.user.id)?,
            default_app,
            manager_name: member.membership.manager_name.clone(),
            counts: BenefitCounts::tally(&rows),
            benefits: rows.iter().map(BenefitView::from).collect(),
        })
    }
}

fn member_row(member: &ActiveMember, tiers: &TierCatalog, organisation: Option<String>) -> Option<MemberRow> {
    Some(MemberRow {
        user_id: member.user.id,
        name: member.user.display_name(),
        email: member.user.email.to_string(),
        organisation,
        tier: TierView::of(member.membership.tier, tiers)?,
        status: member.membership.status.to_string(),
        expiry: member.membership.expiry.map(format_uk_date),
        redeemed: member.redeemed.len(),
    })
}
