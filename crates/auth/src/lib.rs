//! `guildhall-auth`: pure authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: every decision takes the
//! caller's identity and role set as explicit arguments.

pub mod access;
pub mod claims;
pub mod credentials;
pub mod gate;
pub mod landing;
pub mod principal;
pub mod roles;
pub mod user;

pub use access::{
    AccessDecision, AccessReason, AccessRule, AccessSubject, AccessType, App, AppKey, BypassTable,
    decide,
};
pub use claims::{Hs256SessionCodec, SessionClaims, SessionCodec, TokenValidationError, validate_claims};
pub use credentials::{Argon2PasswordHasher, PasswordHasher, generate_temp_password};
pub use gate::{
    AdminAction, AuthzError, DemotionCheck, SelfServiceAction, assess_self_demotion,
    authorize_deletion, authorize_password_reset, require_admin, require_self,
    require_self_or_admin,
};
pub use landing::{Landing, resolve_landing};
pub use principal::Principal;
pub use roles::{Role, RoleKey, RoleSet};
pub use user::{Email, MIN_PASSWORD_LEN, User, UserProfile, validate_new_password};
