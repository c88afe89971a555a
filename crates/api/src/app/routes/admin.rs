use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use guildhall_auth::{AdminAction, require_admin};

use crate::app::routes::common::{forbidden, respond};
use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/organisations", get(list_organisations).post(create_organisation))
        .route("/roles", get(list_roles).post(create_role))
        .route("/dashboard", get(dashboard))
        .route("/consistency", get(consistency))
}

pub async fn list_organisations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.accounts.list_organisations(principal.principal()) {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_organisation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateOrganisationRequest>,
) -> axum::response::Response {
    respond(
        StatusCode::CREATED,
        services
            .accounts
            .create_organisation(principal.principal(), &body.name, &body.kind),
    )
}

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.accounts.list_roles(principal.principal()) {
        Ok(items) => (StatusCode::OK, Json(json!({ "items": items }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateRoleRequest>,
) -> axum::response::Response {
    respond(
        StatusCode::CREATED,
        services.accounts.create_role(principal.principal(), &body.key, &body.label),
    )
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::SelectedMemberQuery>,
) -> axum::response::Response {
    let selected = match query.selected.as_deref().map(errors::parse_user_id).transpose() {
        Ok(selected) => selected,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.dashboards.admin_dashboard(principal.principal(), selected),
    )
}

/// Admin only; reports users holding more than one active membership.
pub async fn consistency(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = require_admin(principal.principal(), AdminAction::ViewAdminDashboard) {
        return forbidden(e);
    }
    respond(StatusCode::OK, services.memberships.consistency_report())
}
