use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use guildhall_auth::AuthzError;
use guildhall_core::{DomainError, DomainResult};

use crate::app::errors;

/// Serialize `Ok` with `status`; map `Err` through the domain error table.
pub fn respond<T: Serialize>(status: StatusCode, result: DomainResult<T>) -> axum::response::Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    errors::domain_error_to_response(DomainError::from(err))
}
