use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.user_id().to_string(),
        "roles": principal.roles().keys(),
        "session_epoch": principal.principal().session_epoch,
    }))
}

pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> axum::response::Response {
    match services.sessions.sign_in(&body.email, &body.password) {
        Ok(signed_in) => (StatusCode::OK, Json(signed_in)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// Always 200; the body says whether the credentials belong to an admin.
pub async fn admin_check(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> impl IntoResponse {
    let is_admin = services.sessions.admin_check(&body.email, &body.password);
    Json(serde_json::json!({ "is_admin": is_admin }))
}
