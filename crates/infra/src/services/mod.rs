//! Request-scoped services over a [`Directory`].
//!
//! Every call opens its own transaction and re-reads current state; nothing
//! is cached between calls, so role and tier changes apply to the very next
//! request.

use std::sync::Arc;

use guildhall_auth::{Argon2PasswordHasher, Hs256SessionCodec, PasswordHasher, SessionCodec};
use guildhall_core::UserId;
use guildhall_membership::{BenefitCatalog, Membership, TierCatalog, TierPricing, TierRank, select_active};

use crate::config::GuildhallConfig;
use crate::store::{Directory, DirectoryTx, StoreError};

pub mod access;
pub mod accounts;
pub mod dashboard;
pub mod membership;
pub mod redemption;
pub mod sessions;

pub use access::AccessResolver;
pub use accounts::{AccountService, AdminUserUpdate, NewUser, UpdateOutcome, UserUpdate, UserView};
pub use dashboard::{
    AdminDashboard, BenefitView, DashboardService, MemberDashboard, MemberDetail, MemberRow, TierView,
};
pub use membership::{ConsistencyReport, MembershipManager};
pub use redemption::RedemptionTracker;
pub use sessions::{AuthError, SessionAuthority, SignedIn};

/// All services wired over one directory.
pub struct Services<D> {
    pub access: AccessResolver<D>,
    pub memberships: MembershipManager<D>,
    pub redemptions: RedemptionTracker<D>,
    pub accounts: AccountService<D>,
    pub dashboards: DashboardService<D>,
    pub sessions: SessionAuthority<D>,
}

impl<D> Services<D>
where
    D: Directory + Clone,
{
    /// Argon2 password hashing and HS256 sessions keyed by the configured secret.
    pub fn new(directory: D, config: &GuildhallConfig) -> Self {
        Self::with_collaborators(
            directory,
            config,
            Arc::new(Argon2PasswordHasher),
            Arc::new(Hs256SessionCodec::new(config.jwt_secret.as_bytes())),
        )
    }

    pub fn with_collaborators(
        directory: D,
        config: &GuildhallConfig,
        hasher: Arc<dyn PasswordHasher>,
        codec: Arc<dyn SessionCodec>,
    ) -> Self {
        let benefits = Arc::new(BenefitCatalog::standard());
        Self {
            access: AccessResolver::new(directory.clone(), config.app_bypass.clone()),
            memberships: MembershipManager::new(directory.clone()),
            redemptions: RedemptionTracker::new(directory.clone(), benefits.clone()),
            accounts: AccountService::new(directory.clone(), hasher.clone()),
            dashboards: DashboardService::new(directory.clone(), benefits, TierPricing::standard()),
            sessions: SessionAuthority::new(directory, hasher, codec, config.session_ttl),
        }
    }
}

/// The user's active membership and its rank, if any.
pub(crate) fn active_membership(
    tx: &dyn DirectoryTx,
    user_id: UserId,
    tiers: &TierCatalog,
) -> Result<Option<(Membership, TierRank)>, StoreError> {
    let memberships = tx.memberships_for_user(user_id)?;
    Ok(select_active(&memberships, tiers).map(|(m, rank)| (m.clone(), rank)))
}
