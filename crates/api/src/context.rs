use guildhall_auth::{Principal, RoleSet};
use guildhall_core::UserId;

/// Authenticated caller for a request.
///
/// Built by the auth middleware from the session token and the directory's
/// current roles; handlers pass the inner principal explicitly into services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn roles(&self) -> &RoleSet {
        &self.principal.roles
    }
}
