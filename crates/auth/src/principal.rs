use serde::{Deserialize, Serialize};

use guildhall_core::UserId;

use crate::roles::RoleSet;

/// An authenticated caller, as resolved from a verified session.
///
/// Passed explicitly into every gate and resolver call; there is no ambient
/// "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: RoleSet,
    /// Session epoch of the user at the time the session was issued.
    pub session_epoch: u64,
}

impl Principal {
    pub fn new(user_id: UserId, roles: RoleSet, session_epoch: u64) -> Self {
        Self {
            user_id,
            roles,
            session_epoch,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }

    pub fn is_self(&self, target: UserId) -> bool {
        self.user_id == target
    }
}
