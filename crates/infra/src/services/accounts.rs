//! Account administration and self-service.
//!
//! Gate checks run before any transaction is opened.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use guildhall_auth::{
    AdminAction, App, AppKey, DemotionCheck, PasswordHasher, Principal, Role, RoleKey, RoleSet,
    SelfServiceAction, User, UserProfile, assess_self_demotion, authorize_deletion,
    authorize_password_reset, generate_temp_password, require_admin, require_self,
    require_self_or_admin, validate_new_password,
};
use guildhall_core::{DomainError, DomainResult, OrganisationId, UserId};
use guildhall_membership::{
    Membership, MembershipForm, MembershipTerms, Organisation, OrganisationType, unique_slug,
};

use super::active_membership;
use super::membership::{deactivate_in, upsert_in};
use crate::pending::{Choice, PendingEntityBatch, ValidatedBatch};
use crate::store::{Directory, DirectoryTx, in_transaction};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password: String,
}

/// Fields submitted by the profile editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    /// App key; `None` clears the default app.
    #[serde(default)]
    pub default_app: Option<String>,
    /// Present only when an admin edits roles, organisation or membership.
    #[serde(default)]
    pub admin: Option<AdminUserUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdminUserUpdate {
    #[serde(default)]
    pub pending: PendingEntityBatch,
    /// `None` clears the user's organisation.
    #[serde(default)]
    pub organisation: Option<Choice<OrganisationId>>,
    /// The complete new role set.
    #[serde(default)]
    pub roles: Vec<Choice<RoleKey>>,
    /// Ignored unless MEMBER is among the new roles and a tier is given.
    #[serde(default)]
    pub membership: Option<MembershipForm>,
    #[serde(default)]
    pub confirm_self_demotion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub user_id: UserId,
    /// The caller removed ADMIN from their own account; they must sign in again.
    pub admin_demoted: bool,
    /// The user's existing sessions no longer authenticate.
    pub sessions_revoked: bool,
}

/// A user with everything the profile editor shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub user: User,
    pub roles: RoleSet,
    pub organisation: Option<Organisation>,
    pub default_app: Option<AppKey>,
    pub active_membership: Option<Membership>,
}

/// Admin part of an edit, checked before the transaction starts.
struct PreparedAdminEdit {
    batch: ValidatedBatch,
    organisation: Option<Choice<OrganisationId>>,
    roles: RoleSet,
    terms: Option<MembershipTerms>,
    demotion: DemotionCheck,
}

pub struct AccountService<D> {
    directory: D,
    hasher: Arc<dyn PasswordHasher>,
}

impl<D> AccountService<D>
where
    D: Directory,
{
    pub fn new(directory: D, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { directory, hasher }
    }

    pub fn create_user(&self, principal: &Principal, new_user: NewUser) -> DomainResult<User> {
        require_admin(principal, AdminAction::CreateUser)?;
        let required = [&new_user.email, &new_user.first_name, &new_user.last_name];
        if required.iter().any(|f| f.trim().is_empty()) || new_user.password.is_empty() {
            return Err(DomainError::validation(
                "Email, first name, last name, and password are required.",
            ));
        }
        let profile = UserProfile::new(&new_user.first_name, &new_user.last_name, &new_user.email)?;
        validate_new_password(&new_user.password)?;
        let hash = self.hasher.hash(&new_user.password)?;

        let user = User::new(profile, hash, Utc::now());
        in_transaction(&self.directory, |tx| {
            tx.insert_user(user.clone())?;
            Ok(())
        })?;
        info!(user_id = %user.id, created_by = %principal.user_id, "user created");
        Ok(user)
    }

    /// Apply a profile edit, plus roles, organisation and membership when an
    /// admin sends them, as one transaction.
    pub fn update_user(&self, principal: &Principal, target: UserId, update: UserUpdate) -> DomainResult<UpdateOutcome> {
        if !principal.is_self(target) || update.admin.is_some() {
            require_admin(principal, AdminAction::EditUser)?;
        }
        let profile = UserProfile::new(&update.first_name, &update.last_name, &update.email)?;
        let default_app = update
            .default_app
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .map(AppKey::parse)
            .transpose()?;
        let admin = update
            .admin
            .map(|admin| prepare_admin_edit(principal, target, admin))
            .transpose()?;

        let outcome = in_transaction(&self.directory, |tx| {
            let now = Utc::now();
            let mut user = tx
                .user(target)?
                .ok_or_else(|| DomainError::not_found(format!("user {target}")))?;
            user.apply_profile(profile, now);
            user.default_app_id = match &default_app {
                Some(key) => Some(find_app(tx, key)?.id),
                None => None,
            };

            let Some(admin) = admin else {
                tx.update_user(user)?;
                return Ok(UpdateOutcome {
                    user_id: target,
                    admin_demoted: false,
                    sessions_revoked: false,
                });
            };

            let resolved = admin.batch.resolve(tx, now)?;
            user.organisation_id = match &admin.organisation {
                Some(choice) => {
                    let id = resolved.organisation(choice)?;
                    if tx.organisation(id)?.is_none() {
                        return Err(DomainError::not_found(format!("organisation {id}")));
                    }
                    Some(id)
                }
                None => None,
            };

            let sessions_revoked = tx.user_roles(target)? != admin.roles;
            if sessions_revoked {
                user.revoke_sessions(now);
            }
            tx.update_user(user)?;
            tx.set_user_roles(target, &admin.roles)?;

            if admin.roles.is_member() {
                if let Some(terms) = admin.terms {
                    upsert_in(tx, target, None, terms, now)?;
                }
            } else {
                deactivate_in(tx, target, now)?;
            }

            Ok(UpdateOutcome {
                user_id: target,
                admin_demoted: admin.demotion.is_demotion(),
                sessions_revoked,
            })
        })?;

        info!(
            user_id = %target,
            edited_by = %principal.user_id,
            admin_demoted = outcome.admin_demoted,
            sessions_revoked = outcome.sessions_revoked,
            "user updated"
        );
        Ok(outcome)
    }

    /// Remove the user with their role assignments, memberships and
    /// redemption record, all or nothing.
    pub fn delete_user(&self, principal: &Principal, target: UserId) -> DomainResult<()> {
        authorize_deletion(principal, target)?;
        in_transaction(&self.directory, |tx| {
            if tx.user(target)?.is_none() {
                return Err(DomainError::not_found(format!("user {target}")));
            }
            let roles = tx.clear_user_roles(target)?;
            let memberships = tx.delete_memberships_for_user(target)?;
            let redemption = tx.delete_redemption(target)?;
            tx.delete_user(target)?;
            info!(
                user_id = %target,
                deleted_by = %principal.user_id,
                roles,
                memberships,
                redemption,
                "user deleted"
            );
            Ok(())
        })
    }

    pub fn change_password(
        &self,
        principal: &Principal,
        target: UserId,
        current: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        require_self(principal, target, SelfServiceAction::ChangePassword)?;
        if current.is_empty() || new_password.is_empty() {
            return Err(DomainError::validation("Current and new password are required."));
        }
        validate_new_password(new_password)?;

        in_transaction(&self.directory, |tx| {
            let mut user = tx
                .user(target)?
                .ok_or_else(|| DomainError::not_found(format!("user {target}")))?;
            if !self.hasher.verify(current, &user.password_hash)? {
                return Err(DomainError::validation("Current password is incorrect."));
            }
            user.set_password_hash(self.hasher.hash(new_password)?, Utc::now());
            tx.update_user(user)?;
            info!(user_id = %target, "password changed");
            Ok(())
        })
    }

    /// Give another user a fresh temporary password and end their sessions.
    pub fn reset_password(&self, principal: &Principal, target: UserId) -> DomainResult<String> {
        authorize_password_reset(principal, target)?;
        let temp = generate_temp_password();
        let hash = self.hasher.hash(&temp)?;

        in_transaction(&self.directory, |tx| {
            let mut user = tx
                .user(target)?
                .ok_or_else(|| DomainError::not_found(format!("user {target}")))?;
            let now = Utc::now();
            user.set_password_hash(hash, now);
            user.revoke_sessions(now);
            tx.update_user(user)?;
            Ok(())
        })?;
        info!(user_id = %target, reset_by = %principal.user_id, "password reset");
        Ok(temp)
    }

    pub fn get_user(&self, principal: &Principal, target: UserId) -> DomainResult<UserView> {
        require_self_or_admin(principal, target, SelfServiceAction::ViewProfile)?;
        let tx = self.directory.begin()?;
        let user = tx
            .user(target)?
            .ok_or_else(|| DomainError::not_found(format!("user {target}")))?;
        user_view(&*tx, user)
    }

    /// `None` clears the default app.
    pub fn select_default_app(&self, principal: &Principal, target: UserId, app: Option<&str>) -> DomainResult<()> {
        require_self(principal, target, SelfServiceAction::SelectDefaultApp)?;
        let key = app.filter(|key| !key.trim().is_empty()).map(AppKey::parse).transpose()?;
        in_transaction(&self.directory, |tx| {
            let mut user = tx
                .user(target)?
                .ok_or_else(|| DomainError::not_found(format!("user {target}")))?;
            user.default_app_id = match &key {
                Some(key) => Some(find_app(tx, key)?.id),
                None => None,
            };
            user.updated_at = Utc::now();
            tx.update_user(user)?;
            Ok(())
        })
    }

    pub fn create_organisation(&self, principal: &Principal, name: &str, kind: &str) -> DomainResult<Organisation> {
        require_admin(principal, AdminAction::CreateOrganisation)?;
        if name.trim().is_empty() {
            return Err(DomainError::validation("Organisation name is required."));
        }
        let kind: OrganisationType = kind.parse()?;
        let organisation = in_transaction(&self.directory, |tx| {
            let taken: BTreeSet<String> = tx
                .organisations()?
                .into_iter()
                .map(|o| o.slug.as_str().to_string())
                .collect();
            let slug = unique_slug(name, |s| taken.contains(s));
            let organisation = Organisation::new(name, kind, slug, Utc::now())?;
            tx.insert_organisation(organisation.clone())?;
            Ok(organisation)
        })?;
        info!(organisation_id = %organisation.id, slug = %organisation.slug, "organisation created");
        Ok(organisation)
    }

    pub fn create_role(&self, principal: &Principal, key: &str, label: &str) -> DomainResult<Role> {
        require_admin(principal, AdminAction::CreateRole)?;
        let role = Role::new(RoleKey::parse(key)?, label)?;
        in_transaction(&self.directory, |tx| {
            tx.insert_role(role.clone())?;
            Ok(())
        })?;
        info!(role = %role.key, "role created");
        Ok(role)
    }

    pub fn list_roles(&self, principal: &Principal) -> DomainResult<Vec<Role>> {
        require_admin(principal, AdminAction::EditUser)?;
        Ok(self.directory.begin()?.roles()?)
    }

    /// Sorted by name.
    pub fn list_organisations(&self, principal: &Principal) -> DomainResult<Vec<Organisation>> {
        require_admin(principal, AdminAction::EditUser)?;
        let mut organisations = self.directory.begin()?.organisations()?;
        organisations.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(organisations)
    }

    pub fn list_apps(&self) -> DomainResult<Vec<App>> {
        Ok(self.directory.begin()?.apps()?)
    }
}

fn prepare_admin_edit(principal: &Principal, target: UserId, admin: AdminUserUpdate) -> DomainResult<PreparedAdminEdit> {
    let batch = admin.pending.validate()?;
    let roles: RoleSet = admin
        .roles
        .iter()
        .map(|choice| batch.role_key(choice))
        .collect::<DomainResult<_>>()?;
    let demotion = assess_self_demotion(principal, target, &roles, admin.confirm_self_demotion)?;

    // Without MEMBER the membership payload is coerced to the clear state.
    let terms = match &admin.membership {
        Some(form) if roles.is_member() && form.tier.is_some() => Some(MembershipTerms::from_form(form)?),
        _ => None,
    };

    Ok(PreparedAdminEdit {
        batch,
        organisation: admin.organisation,
        roles,
        terms,
        demotion,
    })
}

fn find_app(tx: &dyn DirectoryTx, key: &AppKey) -> DomainResult<App> {
    tx.app(key)?
        .ok_or_else(|| DomainError::not_found(format!("app {key}")))
}

pub(crate) fn user_view(tx: &dyn DirectoryTx, user: User) -> DomainResult<UserView> {
    let tiers = tx.tiers()?;
    let organisation = match user.organisation_id {
        Some(id) => tx.organisation(id)?,
        None => None,
    };
    let default_app = match user.default_app_id {
        Some(id) => tx.app_by_id(id)?.map(|a| a.key),
        None => None,
    };
    Ok(UserView {
        roles: tx.user_roles(user.id)?,
        active_membership: active_membership(tx, user.id, &tiers)?.map(|(m, _)| m),
        organisation,
        default_app,
        user,
    })
}
