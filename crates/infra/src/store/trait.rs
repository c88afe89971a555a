use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use guildhall_auth::{App, AppKey, Email, Role, RoleKey, RoleSet, User};
use guildhall_core::{AppId, DomainError, DomainResult, OrganisationId, UserId};
use guildhall_membership::{Membership, Organisation, RedemptionRecord, TierCatalog};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness or referential constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store cannot be used (e.g. a poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::NotFound(what) => DomainError::NotFound(what),
            StoreError::Unavailable(msg) => DomainError::Internal(msg),
        }
    }
}

/// Persisted state of the membership platform.
///
/// All access goes through a transaction. Writes become visible to other
/// transactions only on [`DirectoryTx::commit`]; dropping a transaction
/// discards its writes.
pub trait Directory: Send + Sync {
    fn begin(&self) -> Result<Box<dyn DirectoryTx + '_>, StoreError>;
}

impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    fn begin(&self) -> Result<Box<dyn DirectoryTx + '_>, StoreError> {
        (**self).begin()
    }
}

/// One atomic unit of work.
///
/// Logical tables: users, roles, user roles (join), organisations, tiers
/// (seeded), memberships, apps with their access rules, redemption records.
pub trait DirectoryTx {
    // Users
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;
    fn users(&self) -> Result<Vec<User>, StoreError>;
    /// `Conflict` when the email is already used.
    fn insert_user(&mut self, user: User) -> Result<(), StoreError>;
    /// `Conflict` when the new email belongs to another user.
    fn update_user(&mut self, user: User) -> Result<(), StoreError>;
    /// `Conflict` while role assignments, memberships or a redemption record
    /// still reference the user.
    fn delete_user(&mut self, id: UserId) -> Result<(), StoreError>;

    // Roles
    fn roles(&self) -> Result<Vec<Role>, StoreError>;
    fn role(&self, key: &RoleKey) -> Result<Option<Role>, StoreError>;
    fn insert_role(&mut self, role: Role) -> Result<(), StoreError>;

    // User roles
    fn user_roles(&self, user_id: UserId) -> Result<RoleSet, StoreError>;
    /// Replace the user's role set. Every key must name an existing role.
    fn set_user_roles(&mut self, user_id: UserId, roles: &RoleSet) -> Result<(), StoreError>;
    fn clear_user_roles(&mut self, user_id: UserId) -> Result<usize, StoreError>;
    fn holders_of(&self, role: &RoleKey) -> Result<BTreeSet<UserId>, StoreError>;

    // Organisations
    fn organisation(&self, id: OrganisationId) -> Result<Option<Organisation>, StoreError>;
    fn organisations(&self) -> Result<Vec<Organisation>, StoreError>;
    /// `Conflict` on a duplicate slug.
    fn insert_organisation(&mut self, organisation: Organisation) -> Result<(), StoreError>;

    // Tiers
    fn tiers(&self) -> Result<TierCatalog, StoreError>;
    fn set_tiers(&mut self, tiers: TierCatalog) -> Result<(), StoreError>;

    // Memberships
    fn memberships(&self) -> Result<Vec<Membership>, StoreError>;
    fn memberships_for_user(&self, user_id: UserId) -> Result<Vec<Membership>, StoreError>;
    fn insert_membership(&mut self, membership: Membership) -> Result<(), StoreError>;
    fn update_membership(&mut self, membership: Membership) -> Result<(), StoreError>;
    fn delete_memberships_for_user(&mut self, user_id: UserId) -> Result<usize, StoreError>;

    // Apps
    fn apps(&self) -> Result<Vec<App>, StoreError>;
    fn app(&self, key: &AppKey) -> Result<Option<App>, StoreError>;
    fn app_by_id(&self, id: AppId) -> Result<Option<App>, StoreError>;
    /// `Conflict` on a duplicate key.
    fn insert_app(&mut self, app: App) -> Result<(), StoreError>;

    // Redemptions
    fn redemption(&self, user_id: UserId) -> Result<Option<RedemptionRecord>, StoreError>;
    fn redemptions(&self) -> Result<Vec<RedemptionRecord>, StoreError>;
    fn upsert_redemption(&mut self, record: RedemptionRecord) -> Result<(), StoreError>;
    fn delete_redemption(&mut self, user_id: UserId) -> Result<bool, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Run `work` in one transaction, committing only if it succeeds.
///
/// Any error aborts the whole unit; nothing it wrote becomes visible.
pub fn in_transaction<D, T, F>(directory: &D, work: F) -> DomainResult<T>
where
    D: Directory + ?Sized,
    F: FnOnce(&mut dyn DirectoryTx) -> DomainResult<T>,
{
    let mut tx = directory.begin()?;
    let out = work(tx.as_mut())?;
    tx.commit()?;
    Ok(out)
}
