use tracing::{debug, warn};

use guildhall_auth::{
    AccessDecision, AccessReason, AccessSubject, App, AppKey, BypassTable, Landing, decide, resolve_landing,
};
use guildhall_core::{DomainResult, UserId};
use guildhall_membership::TierCatalog;

use super::active_membership;
use crate::store::{Directory, DirectoryTx, StoreError};

/// Entitlement resolver over stored roles, memberships and app rules.
pub struct AccessResolver<D> {
    directory: D,
    bypass: BypassTable,
}

impl<D> AccessResolver<D>
where
    D: Directory,
{
    pub fn new(directory: D, bypass: BypassTable) -> Self {
        Self { directory, bypass }
    }

    /// `true` iff the user may use the app.
    ///
    /// Fails closed: unknown users and apps, and any internal error, deny.
    pub fn can_access_app(&self, user_id: UserId, app_key: &str) -> bool {
        match self.explain(user_id, app_key) {
            Ok(decision) => decision.granted,
            Err(err) => {
                warn!(%user_id, app = app_key, error = %err, "access check failed; denying");
                false
            }
        }
    }

    /// The decision together with the rule that produced it.
    pub fn explain(&self, user_id: UserId, app_key: &str) -> DomainResult<AccessDecision> {
        let tx = self.directory.begin()?;
        let tiers = tx.tiers()?;
        let Some(subject) = load_subject(tx.as_ref(), user_id, &tiers)? else {
            debug!(%user_id, app = app_key, "access denied: unknown user");
            return Ok(AccessDecision::deny(AccessReason::UnknownUser));
        };
        let app = tx.app(&AppKey::new(app_key))?;
        let decision = decide(&subject, app.as_ref(), &self.bypass, &tiers);
        debug!(%user_id, app = app_key, granted = decision.granted, reason = ?decision.reason, "access decided");
        Ok(decision)
    }

    /// Every app with the user's decision for it.
    pub fn app_decisions(&self, user_id: UserId) -> DomainResult<Vec<(App, AccessDecision)>> {
        let tx = self.directory.begin()?;
        let tiers = tx.tiers()?;
        let subject = load_subject(tx.as_ref(), user_id, &tiers)?;
        Ok(tx
            .apps()?
            .into_iter()
            .map(|app| {
                let decision = match &subject {
                    Some(subject) => decide(subject, Some(&app), &self.bypass, &tiers),
                    None => AccessDecision::deny(AccessReason::UnknownUser),
                };
                (app, decision)
            })
            .collect())
    }

    /// Post-sign-in destination for the user.
    pub fn landing(&self, user_id: UserId) -> DomainResult<Landing> {
        let tx = self.directory.begin()?;
        landing_for(tx.as_ref(), user_id)
    }
}

pub(crate) fn load_subject(
    tx: &dyn DirectoryTx,
    user_id: UserId,
    tiers: &TierCatalog,
) -> Result<Option<AccessSubject>, StoreError> {
    if tx.user(user_id)?.is_none() {
        return Ok(None);
    }
    Ok(Some(AccessSubject {
        roles: tx.user_roles(user_id)?,
        active_rank: active_membership(tx, user_id, tiers)?.map(|(_, rank)| rank),
    }))
}

pub(crate) fn landing_for(tx: &dyn DirectoryTx, user_id: UserId) -> DomainResult<Landing> {
    let Some(user) = tx.user(user_id)? else {
        return Ok(Landing::Home);
    };
    let default_app = match user.default_app_id {
        Some(id) => tx.app_by_id(id)?.map(|a| a.key),
        None => None,
    };
    Ok(resolve_landing(&tx.user_roles(user_id)?, default_app.as_ref()))
}
