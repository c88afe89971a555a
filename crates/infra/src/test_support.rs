//! Fixtures shared by unit and integration tests.

use std::sync::Arc;

use guildhall_auth::{PasswordHasher, Principal};
use guildhall_core::{DomainResult, UserId};

use crate::config::GuildhallConfig;
use crate::services::Services;
use crate::store::{Directory, InMemoryDirectory};

/// Reversible "hash" so tests skip argon2's cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> DomainResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> DomainResult<bool> {
        Ok(hash.strip_prefix("plain$") == Some(password))
    }
}

pub fn services(dir: &Arc<InMemoryDirectory>) -> Services<Arc<InMemoryDirectory>> {
    let config = GuildhallConfig::default();
    Services::with_collaborators(
        dir.clone(),
        &config,
        Arc::new(PlainHasher),
        Arc::new(guildhall_auth::Hs256SessionCodec::new(config.jwt_secret.as_bytes())),
    )
}

/// Principal for a stored user with their current roles and epoch.
pub fn principal_for<D: Directory>(dir: &D, user_id: UserId) -> Principal {
    let tx = dir.begin().unwrap();
    let user = tx.user(user_id).unwrap().unwrap();
    Principal::new(user_id, tx.user_roles(user_id).unwrap(), user.session_epoch)
}
