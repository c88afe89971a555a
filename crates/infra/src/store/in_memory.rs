use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use guildhall_auth::{App, AppKey, Email, Role, RoleKey, RoleSet, User};
use guildhall_core::{AppId, MembershipId, OrganisationId, UserId};
use guildhall_membership::{Membership, Organisation, RedemptionRecord, TierCatalog};

use super::r#trait::{Directory, DirectoryTx, StoreError};

const EMAIL_TAKEN: &str = "This email is already associated with another account.";

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<RoleKey, Role>,
    user_roles: BTreeMap<UserId, RoleSet>,
    organisations: BTreeMap<OrganisationId, Organisation>,
    tiers: TierCatalog,
    memberships: BTreeMap<MembershipId, Membership>,
    apps: BTreeMap<AppKey, App>,
    redemptions: BTreeMap<UserId, RedemptionRecord>,
}

impl Tables {
    fn email_owner(&self, email: &Email) -> Option<UserId> {
        self.users.values().find(|u| &u.email == email).map(|u| u.id)
    }

    fn require_user(&self, id: UserId) -> Result<(), StoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("user {id}")))
        }
    }
}

/// In-memory directory for tests/dev.
///
/// Transactions are serialised by a single lock held for the lifetime of the
/// transaction. Writes go to a private copy of the tables that replaces the
/// committed state on commit.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tables: Mutex<Tables>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Directory for InMemoryDirectory {
    fn begin(&self) -> Result<Box<dyn DirectoryTx + '_>, StoreError> {
        let committed = self
            .tables
            .lock()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))?;
        Ok(Box::new(InMemoryTx {
            committed,
            working: None,
        }))
    }
}

struct InMemoryTx<'a> {
    committed: MutexGuard<'a, Tables>,
    /// Copy-on-write: `None` until the first write.
    working: Option<Tables>,
}

impl InMemoryTx<'_> {
    fn read(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&*self.committed)
    }

    fn write(&mut self) -> &mut Tables {
        self.working.get_or_insert_with(|| self.committed.clone())
    }
}

impl DirectoryTx for InMemoryTx<'_> {
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.get(&id).cloned())
    }

    fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let tables = self.read();
        Ok(tables.email_owner(email).and_then(|id| tables.users.get(&id).cloned()))
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read().users.values().cloned().collect())
    }

    fn insert_user(&mut self, user: User) -> Result<(), StoreError> {
        if self.read().email_owner(&user.email).is_some() {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }
        self.write().users.insert(user.id, user);
        Ok(())
    }

    fn update_user(&mut self, user: User) -> Result<(), StoreError> {
        let tables = self.read();
        tables.require_user(user.id)?;
        if tables.email_owner(&user.email).is_some_and(|owner| owner != user.id) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }
        self.write().users.insert(user.id, user);
        Ok(())
    }

    fn delete_user(&mut self, id: UserId) -> Result<(), StoreError> {
        let tables = self.read();
        tables.require_user(id)?;
        let has_roles = tables.user_roles.get(&id).is_some_and(|r| !r.is_empty());
        let has_memberships = tables.memberships.values().any(|m| m.user_id == id);
        if has_roles || has_memberships || tables.redemptions.contains_key(&id) {
            return Err(StoreError::Conflict(format!("user {id} is still referenced")));
        }
        self.write().users.remove(&id);
        Ok(())
    }

    fn roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.read().roles.values().cloned().collect())
    }

    fn role(&self, key: &RoleKey) -> Result<Option<Role>, StoreError> {
        Ok(self.read().roles.get(key).cloned())
    }

    fn insert_role(&mut self, role: Role) -> Result<(), StoreError> {
        if self.read().roles.contains_key(&role.key) {
            return Err(StoreError::Conflict(format!("Role {} already exists.", role.key)));
        }
        self.write().roles.insert(role.key.clone(), role);
        Ok(())
    }

    fn user_roles(&self, user_id: UserId) -> Result<RoleSet, StoreError> {
        Ok(self.read().user_roles.get(&user_id).cloned().unwrap_or_default())
    }

    fn set_user_roles(&mut self, user_id: UserId, roles: &RoleSet) -> Result<(), StoreError> {
        let tables = self.read();
        tables.require_user(user_id)?;
        if let Some(missing) = roles.iter().find(|k| !tables.roles.contains_key(*k)) {
            return Err(StoreError::NotFound(format!("role {missing}")));
        }
        let tables = self.write();
        if roles.is_empty() {
            tables.user_roles.remove(&user_id);
        } else {
            tables.user_roles.insert(user_id, roles.clone());
        }
        Ok(())
    }

    fn clear_user_roles(&mut self, user_id: UserId) -> Result<usize, StoreError> {
        let count = self.read().user_roles.get(&user_id).map_or(0, RoleSet::len);
        if count > 0 {
            self.write().user_roles.remove(&user_id);
        }
        Ok(count)
    }

    fn holders_of(&self, role: &RoleKey) -> Result<BTreeSet<UserId>, StoreError> {
        Ok(self
            .read()
            .user_roles
            .iter()
            .filter(|(_, roles)| roles.contains(role))
            .map(|(id, _)| *id)
            .collect())
    }

    fn organisation(&self, id: OrganisationId) -> Result<Option<Organisation>, StoreError> {
        Ok(self.read().organisations.get(&id).cloned())
    }

    fn organisations(&self) -> Result<Vec<Organisation>, StoreError> {
        Ok(self.read().organisations.values().cloned().collect())
    }

    fn insert_organisation(&mut self, organisation: Organisation) -> Result<(), StoreError> {
        if self.read().organisations.values().any(|o| o.slug == organisation.slug) {
            return Err(StoreError::Conflict(format!(
                "organisation slug '{}' is already used",
                organisation.slug
            )));
        }
        self.write().organisations.insert(organisation.id, organisation);
        Ok(())
    }

    fn tiers(&self) -> Result<TierCatalog, StoreError> {
        Ok(self.read().tiers.clone())
    }

    fn set_tiers(&mut self, tiers: TierCatalog) -> Result<(), StoreError> {
        self.write().tiers = tiers;
        Ok(())
    }

    fn memberships(&self) -> Result<Vec<Membership>, StoreError> {
        Ok(self.read().memberships.values().cloned().collect())
    }

    fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, StoreError> {
        Ok(self
            .read()
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    fn insert_membership(&mut self, membership: Membership) -> Result<(), StoreError> {
        let tables = self.read();
        tables.require_user(membership.user_id)?;
        if !tables.organisations.contains_key(&membership.organisation_id) {
            return Err(StoreError::NotFound(format!("organisation {}", membership.organisation_id)));
        }
        if tables.memberships.contains_key(&membership.id) {
            return Err(StoreError::Conflict(format!("membership {} already exists", membership.id)));
        }
        self.write().memberships.insert(membership.id, membership);
        Ok(())
    }

    fn update_membership(&mut self, membership: Membership) -> Result<(), StoreError> {
        let tables = self.read();
        if !tables.memberships.contains_key(&membership.id) {
            return Err(StoreError::NotFound(format!("membership {}", membership.id)));
        }
        if !tables.organisations.contains_key(&membership.organisation_id) {
            return Err(StoreError::NotFound(format!("organisation {}", membership.organisation_id)));
        }
        self.write().memberships.insert(membership.id, membership);
        Ok(())
    }

    fn delete_memberships_for_user(&mut self, user_id: UserId) -> Result<usize, StoreError> {
        let doomed: Vec<MembershipId> = self
            .read()
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.id)
            .collect();
        if !doomed.is_empty() {
            let tables = self.write();
            for id in &doomed {
                tables.memberships.remove(id);
            }
        }
        Ok(doomed.len())
    }

    fn apps(&self) -> Result<Vec<App>, StoreError> {
        Ok(self.read().apps.values().cloned().collect())
    }

    fn app(&self, key: &AppKey) -> Result<Option<App>, StoreError> {
        Ok(self.read().apps.get(key).cloned())
    }

    fn app_by_id(&self, id: AppId) -> Result<Option<App>, StoreError> {
        Ok(self.read().apps.values().find(|a| a.id == id).cloned())
    }

    fn insert_app(&mut self, app: App) -> Result<(), StoreError> {
        if self.read().apps.contains_key(&app.key) {
            return Err(StoreError::Conflict(format!("app {} already exists", app.key)));
        }
        self.write().apps.insert(app.key.clone(), app);
        Ok(())
    }

    fn redemption(&self, user_id: UserId) -> Result<Option<RedemptionRecord>, StoreError> {
        Ok(self.read().redemptions.get(&user_id).cloned())
    }

    fn redemptions(&self) -> Result<Vec<RedemptionRecord>, StoreError> {
        Ok(self.read().redemptions.values().cloned().collect())
    }

    fn upsert_redemption(&mut self, record: RedemptionRecord) -> Result<(), StoreError> {
        self.read().require_user(record.user_id)?;
        self.write().redemptions.insert(record.user_id, record);
        Ok(())
    }

    fn delete_redemption(&mut self, user_id: UserId) -> Result<bool, StoreError> {
        if !self.read().redemptions.contains_key(&user_id) {
            return Ok(false);
        }
        Ok(self.write().redemptions.remove(&user_id).is_some())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut committed, working } = *self;
        if let Some(tables) = working {
            *committed = tables;
        }
        Ok(())
    }
}
