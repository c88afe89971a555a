//! `guildhall-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod date;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use date::{format_uk_date, parse_uk_date, parse_uk_date_opt};
pub use entity::{Entity, index_by_id};
pub use error::{DomainError, DomainResult};
pub use id::{AppId, MembershipId, OrganisationId, RedemptionId, RoleId, UserId};
pub use value_object::ValueObject;
