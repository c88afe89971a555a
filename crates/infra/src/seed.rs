//! Standard reference data and the optional bootstrap administrator.
//!
//! Seeding is idempotent: rows that already exist are left untouched, so it
//! is safe to run on every start.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use guildhall_auth::{
    AccessRule, App, AppKey, Email, PasswordHasher, Role, RoleKey, RoleSet, User, UserProfile,
    validate_new_password,
};
use guildhall_core::{DomainResult, UserId};
use guildhall_membership::{TierCatalog, TierKey};

use crate::config::BootstrapAdmin;
use crate::store::{Directory, DirectoryTx, in_transaction};

/// What a seeding run actually created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub tiers_seeded: bool,
    pub roles_created: Vec<RoleKey>,
    pub apps_created: Vec<AppKey>,
    pub admin_created: Option<UserId>,
}

pub fn standard_roles() -> Vec<(RoleKey, &'static str)> {
    vec![
        (RoleKey::Admin, "Admin"),
        (RoleKey::Member, "Member"),
        (RoleKey::Student, "Student"),
        (RoleKey::ModuleLeader, "Module Leader"),
    ]
}

/// The protected apps with their ALLOW rules.
///
/// TALENT_DISCOVERY carries two rules; the lower one (BRONZE) is effective.
pub fn standard_apps() -> Vec<App> {
    vec![
        App::new(
            AppKey::new(AppKey::MEMBERSHIP_DASHBOARD),
            "Membership Dashboard",
            vec![AccessRule::allow(TierKey::Bronze)],
        ),
        App::new(
            AppKey::new(AppKey::IXN_WORKFLOW_MANAGER),
            "IXN Workflow Manager",
            vec![AccessRule::allow(TierKey::Gold)],
        ),
        App::new(
            AppKey::new(AppKey::TALENT_DISCOVERY),
            "Talent Discovery",
            vec![AccessRule::allow(TierKey::Bronze), AccessRule::allow(TierKey::Gold)],
        ),
    ]
}

/// Seed tiers, roles and apps, then the bootstrap admin if one is configured.
pub fn seed<D>(directory: &D, admin: Option<&BootstrapAdmin>, hasher: &dyn PasswordHasher) -> DomainResult<SeedReport>
where
    D: Directory + ?Sized,
{
    // Hash outside the transaction; argon2 is slow.
    let admin = match admin {
        Some(admin) => {
            let profile = UserProfile::new("System", "Administrator", &admin.email)?;
            validate_new_password(&admin.password)?;
            Some((profile, hasher.hash(&admin.password)?))
        }
        None => None,
    };

    let report = in_transaction(directory, |tx| {
        let mut report = SeedReport::default();
        if tx.tiers()?.is_empty() {
            tx.set_tiers(TierCatalog::standard())?;
            report.tiers_seeded = true;
        }
        for (key, label) in standard_roles() {
            if tx.role(&key)?.is_none() {
                tx.insert_role(Role::new(key.clone(), label)?)?;
                report.roles_created.push(key);
            }
        }
        for app in standard_apps() {
            if tx.app(&app.key)?.is_none() {
                report.apps_created.push(app.key.clone());
                tx.insert_app(app)?;
            }
        }
        if let Some((profile, hash)) = admin {
            report.admin_created = seed_admin(tx, profile, hash)?;
        }
        Ok(report)
    })?;

    info!(
        tiers_seeded = report.tiers_seeded,
        roles_created = report.roles_created.len(),
        apps_created = report.apps_created.len(),
        admin_created = report.admin_created.is_some(),
        "directory seeded"
    );
    Ok(report)
}

/// An existing account with the same email is kept as is.
fn seed_admin(tx: &mut dyn DirectoryTx, profile: UserProfile, hash: String) -> DomainResult<Option<UserId>> {
    let email: &Email = &profile.email;
    if tx.user_by_email(email)?.is_some() {
        return Ok(None);
    }
    let user = User::new(profile, hash, Utc::now());
    let id = user.id;
    tx.insert_user(user)?;
    tx.set_user_roles(id, &[RoleKey::Admin].into_iter().collect::<RoleSet>())?;
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDirectory;
    use crate::test_support::PlainHasher;

    fn bootstrap() -> BootstrapAdmin {
        BootstrapAdmin {
            email: "root@guildhall.test".to_string(),
            password: "correct-horse".to_string(),
        }
    }

    #[test]
    fn seeds_reference_data_once() {
        let dir = InMemoryDirectory::new();
        let first = seed(&dir, None, &PlainHasher).unwrap();
        assert_eq!(first.roles_created.len(), 4);
        assert_eq!(first.apps_created.len(), 3);
        assert!(first.admin_created.is_none());

        let second = seed(&dir, None, &PlainHasher).unwrap();
        assert_eq!(second, SeedReport::default());

        let tx = dir.begin().unwrap();
        assert_eq!(tx.tiers().unwrap(), TierCatalog::standard());
        assert_eq!(tx.role(&RoleKey::ModuleLeader).unwrap().unwrap().label, "Module Leader");
        assert_eq!(tx.apps().unwrap().len(), 3);
    }

    #[test]
    fn bootstrap_admin_is_created_with_admin_role() {
        let dir = InMemoryDirectory::new();
        let report = seed(&dir, Some(&bootstrap()), &PlainHasher).unwrap();
        let id = report.admin_created.unwrap();

        let tx = dir.begin().unwrap();
        assert!(tx.user_roles(id).unwrap().is_admin());
        drop(tx);

        let again = seed(&dir, Some(&bootstrap()), &PlainHasher).unwrap();
        assert!(again.admin_created.is_none());
    }

    #[test]
    fn short_bootstrap_password_is_rejected() {
        let dir = InMemoryDirectory::new();
        let admin = BootstrapAdmin {
            password: "short".to_string(),
            ..bootstrap()
        };
        assert!(seed(&dir, Some(&admin), &PlainHasher).is_err());
    }
}
