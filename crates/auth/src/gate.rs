//! Role/Admin authorization gate.
//!
//! Coarse checks applied before any data is read or written on behalf of a
//! mutating operation. No IO, no panics.

use serde::Serialize;
use thiserror::Error;

use guildhall_core::{DomainError, UserId};

use crate::principal::Principal;
use crate::roles::{RoleKey, RoleSet};

/// Operations reserved for holders of ADMIN.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    CreateUser,
    DeleteUser,
    EditUser,
    ResetPassword,
    CreateOrganisation,
    CreateRole,
    ManageMembership,
    SetRedemptions,
    ViewAdminDashboard,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::CreateUser => "create user",
            AdminAction::DeleteUser => "delete user",
            AdminAction::EditUser => "edit user",
            AdminAction::ResetPassword => "reset password",
            AdminAction::CreateOrganisation => "create organisation",
            AdminAction::CreateRole => "create role",
            AdminAction::ManageMembership => "manage membership",
            AdminAction::SetRedemptions => "set redeemed benefits",
            AdminAction::ViewAdminDashboard => "view admin dashboard",
        }
    }
}

impl core::fmt::Display for AdminAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations a user may perform on their own account only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfServiceAction {
    ChangePassword,
    SelectDefaultApp,
    EditProfile,
    DeleteAccount,
    ViewProfile,
    ViewMemberDashboard,
}

impl SelfServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelfServiceAction::ChangePassword => "change password",
            SelfServiceAction::SelectDefaultApp => "select default app",
            SelfServiceAction::EditProfile => "edit profile",
            SelfServiceAction::DeleteAccount => "delete account",
            SelfServiceAction::ViewProfile => "view profile",
            SelfServiceAction::ViewMemberDashboard => "view member dashboard",
        }
    }
}

impl core::fmt::Display for SelfServiceAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {0} requires the ADMIN role")]
    AdminRequired(AdminAction),

    #[error("forbidden: {0} is only allowed on your own account")]
    NotSelf(SelfServiceAction),

    #[error("forbidden: remove the ADMIN role from your account before deleting it")]
    AdminSelfDeletion,

    #[error("forbidden: use change password to update your own password")]
    SelfPasswordReset,

    #[error("removing your own ADMIN role must be confirmed")]
    DemotionUnconfirmed,
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::DemotionUnconfirmed => DomainError::Validation(err.to_string()),
            other => DomainError::Forbidden(other.to_string()),
        }
    }
}

pub fn require_admin(principal: &Principal, action: AdminAction) -> Result<(), AuthzError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired(action))
    }
}

pub fn require_self(principal: &Principal, target: UserId, action: SelfServiceAction) -> Result<(), AuthzError> {
    if principal.is_self(target) {
        Ok(())
    } else {
        Err(AuthzError::NotSelf(action))
    }
}

/// Self access, or any target for admins.
pub fn require_self_or_admin(
    principal: &Principal,
    target: UserId,
    action: SelfServiceAction,
) -> Result<(), AuthzError> {
    if principal.is_admin() {
        return Ok(());
    }
    require_self(principal, target, action)
}

/// Admins may delete anyone but themselves; everyone else only themselves.
pub fn authorize_deletion(principal: &Principal, target: UserId) -> Result<(), AuthzError> {
    match (principal.is_self(target), principal.is_admin()) {
        (true, true) => Err(AuthzError::AdminSelfDeletion),
        (true, false) => Ok(()),
        (false, true) => Ok(()),
        (false, false) => Err(AuthzError::NotSelf(SelfServiceAction::DeleteAccount)),
    }
}

pub fn authorize_password_reset(principal: &Principal, target: UserId) -> Result<(), AuthzError> {
    require_admin(principal, AdminAction::ResetPassword)?;
    if principal.is_self(target) {
        return Err(AuthzError::SelfPasswordReset);
    }
    Ok(())
}

/// Outcome of checking a role edit for self-demotion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DemotionCheck {
    Unchanged,
    /// The caller is removing ADMIN from their own account and confirmed it.
    SelfDemotion,
}

impl DemotionCheck {
    pub fn is_demotion(&self) -> bool {
        matches!(self, DemotionCheck::SelfDemotion)
    }
}

pub fn assess_self_demotion(
    principal: &Principal,
    target: UserId,
    next_roles: &RoleSet,
    confirmed: bool,
) -> Result<DemotionCheck, AuthzError> {
    let demoting = principal.is_self(target) && principal.is_admin() && !next_roles.contains(&RoleKey::Admin);
    match (demoting, confirmed) {
        (false, _) => Ok(DemotionCheck::Unchanged),
        (true, true) => Ok(DemotionCheck::SelfDemotion),
        (true, false) => Err(AuthzError::DemotionUnconfirmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &[RoleKey]) -> Principal {
        Principal::new(UserId::new(), roles.iter().cloned().collect(), 0)
    }

    #[test]
    fn admin_actions_require_admin() {
        let admin = principal(&[RoleKey::Admin]);
        let member = principal(&[RoleKey::Member]);
        assert!(require_admin(&admin, AdminAction::CreateRole).is_ok());
        assert_eq!(
            require_admin(&member, AdminAction::CreateRole),
            Err(AuthzError::AdminRequired(AdminAction::CreateRole))
        );
    }

    #[test]
    fn self_service_requires_matching_identity() {
        let user = principal(&[]);
        let admin = principal(&[RoleKey::Admin]);
        assert!(require_self(&user, user.user_id, SelfServiceAction::ChangePassword).is_ok());
        assert!(require_self(&admin, user.user_id, SelfServiceAction::ChangePassword).is_err());
        assert!(require_self_or_admin(&admin, user.user_id, SelfServiceAction::ViewProfile).is_ok());
        assert!(require_self_or_admin(&user, admin.user_id, SelfServiceAction::ViewProfile).is_err());
    }

    #[test]
    fn deletion_rules() {
        let admin = principal(&[RoleKey::Admin]);
        let user = principal(&[RoleKey::Member]);
        assert_eq!(authorize_deletion(&admin, admin.user_id), Err(AuthzError::AdminSelfDeletion));
        assert!(authorize_deletion(&admin, user.user_id).is_ok());
        assert!(authorize_deletion(&user, user.user_id).is_ok());
        assert!(authorize_deletion(&user, admin.user_id).is_err());
    }

    #[test]
    fn admins_cannot_reset_their_own_password() {
        let admin = principal(&[RoleKey::Admin]);
        let user = principal(&[]);
        assert_eq!(authorize_password_reset(&admin, admin.user_id), Err(AuthzError::SelfPasswordReset));
        assert!(authorize_password_reset(&admin, user.user_id).is_ok());
        assert!(authorize_password_reset(&user, admin.user_id).is_err());
    }

    #[test]
    fn self_demotion_needs_confirmation() {
        let admin = principal(&[RoleKey::Admin, RoleKey::Member]);
        let without_admin: RoleSet = [RoleKey::Member].into_iter().collect();

        let err = assess_self_demotion(&admin, admin.user_id, &without_admin, false).unwrap_err();
        assert!(matches!(DomainError::from(err), DomainError::Validation(_)));
        assert_eq!(
            assess_self_demotion(&admin, admin.user_id, &without_admin, true),
            Ok(DemotionCheck::SelfDemotion)
        );
        // Demoting someone else is an ordinary edit.
        assert_eq!(
            assess_self_demotion(&admin, UserId::new(), &without_admin, false),
            Ok(DemotionCheck::Unchanged)
        );
    }

    #[test]
    fn gate_rejections_map_to_forbidden() {
        let err: DomainError = AuthzError::AdminRequired(AdminAction::DeleteUser).into();
        assert_eq!(err.code(), "forbidden");
    }
}
