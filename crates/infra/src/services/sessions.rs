//! Sign-in and session authentication.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use guildhall_auth::{
    Email, Landing, PasswordHasher, Principal, SessionClaims, SessionCodec, TokenValidationError, User,
};
use guildhall_core::DomainError;

use super::access::landing_for;
use crate::store::{Directory, DirectoryTx, StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately says nothing about which part was wrong.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenValidationError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Domain(err.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub principal: Principal,
    pub landing: Landing,
}

/// Issues session tokens and turns them back into principals.
pub struct SessionAuthority<D> {
    directory: D,
    hasher: Arc<dyn PasswordHasher>,
    codec: Arc<dyn SessionCodec>,
    ttl: Duration,
}

impl<D> SessionAuthority<D>
where
    D: Directory,
{
    pub fn new(directory: D, hasher: Arc<dyn PasswordHasher>, codec: Arc<dyn SessionCodec>, ttl: Duration) -> Self {
        Self {
            directory,
            hasher,
            codec,
            ttl,
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let tx = self.directory.begin()?;
        let user = self.verify_credentials(&*tx, email, password)?;

        let principal = Principal::new(user.id, tx.user_roles(user.id)?, user.session_epoch);
        let landing = landing_for(&*tx, user.id)?;
        let claims = SessionClaims::issue(&principal, Utc::now(), self.ttl);
        let token = self.codec.encode(&claims)?;
        info!(user_id = %user.id, roles = ?principal.roles.keys(), "signed in");
        Ok(SignedIn {
            token,
            principal,
            landing,
        })
    }

    /// Decode `token` and check it against the user's current state.
    ///
    /// The returned principal carries the roles held *now*; a token whose
    /// epoch predates a role change or password reset is `Stale`.
    pub fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let claims = self.codec.decode(token, now)?;
        let tx = self.directory.begin()?;
        let user = match tx.user(claims.sub)? {
            Some(user) if user.session_epoch == claims.epoch => user,
            _ => return Err(TokenValidationError::Stale.into()),
        };
        Ok(Principal::new(user.id, tx.user_roles(user.id)?, user.session_epoch))
    }

    /// `true` iff the credentials are valid and belong to an admin.
    pub fn admin_check(&self, email: &str, password: &str) -> bool {
        let checked = self.directory.begin().map_err(AuthError::from).and_then(|tx| {
            let user = self.verify_credentials(&*tx, email, password)?;
            Ok(tx.user_roles(user.id)?.is_admin())
        });
        match checked {
            Ok(is_admin) => is_admin,
            Err(AuthError::Domain(err)) => {
                warn!(error = %err, "admin check failed");
                false
            }
            Err(_) => false,
        }
    }

    fn verify_credentials(&self, tx: &dyn DirectoryTx, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(user) = tx.user_by_email(&email)? else {
            debug!(%email, "credentials for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(user_id = %user.id, "credentials with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }
}
