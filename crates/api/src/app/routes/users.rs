use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use guildhall_auth::{SelfServiceAction, require_self_or_admin};
use guildhall_infra::services::{NewUser, UserUpdate};

use crate::app::routes::common::{forbidden, respond};
use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
        .route("/:id/password", post(change_password))
        .route("/:id/password/reset", post(reset_password))
        .route("/:id/default-app", put(select_default_app))
        .route("/:id/membership", put(upsert_membership).delete(deactivate_membership))
        .route("/:id/redemptions", get(get_redemptions).put(set_redemptions))
        .route("/:id/dashboard", get(member_dashboard))
        .route("/:id/benefits/:benefit", get(benefit_detail))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewUser>,
) -> axum::response::Response {
    respond(
        StatusCode::CREATED,
        services.accounts.create_user(principal.principal(), body),
    )
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.accounts.get_user(principal.principal(), user_id))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<UserUpdate>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.accounts.update_user(principal.principal(), user_id, body),
    )
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.accounts.delete_user(principal.principal(), user_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangePasswordRequest>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.accounts.change_password(
        principal.principal(),
        user_id,
        &body.current_password,
        &body.new_password,
    ) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.accounts.reset_password(principal.principal(), user_id) {
        Ok(temp) => (StatusCode::OK, Json(json!({ "temporary_password": temp }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn select_default_app(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::DefaultAppRequest>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services
        .accounts
        .select_default_app(principal.principal(), user_id, body.app.as_deref())
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn upsert_membership(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::MembershipRequest>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .memberships
            .upsert_membership(principal.principal(), user_id, body.organisation_id, &body.form),
    )
}

pub async fn deactivate_membership(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.memberships.deactivate(principal.principal(), user_id) {
        Ok(changed) => (StatusCode::OK, Json(json!({ "deactivated": changed }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_redemptions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = require_self_or_admin(principal.principal(), user_id, SelfServiceAction::ViewMemberDashboard) {
        return forbidden(e);
    }
    match services.redemptions.get_redeemed_benefits(user_id) {
        Ok(benefits) => (StatusCode::OK, Json(json!({ "benefits": benefits }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn set_redemptions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RedemptionsRequest>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services
        .redemptions
        .set_redeemed_benefits(principal.principal(), user_id, &body.benefits)
    {
        Ok(benefits) => (StatusCode::OK, Json(json!({ "benefits": benefits }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn my_dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::BenefitFilterQuery>,
) -> axum::response::Response {
    respond(
        StatusCode::OK,
        services
            .dashboards
            .member_dashboard(principal.principal(), principal.user_id(), query.state),
    )
}

pub async fn member_dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::BenefitFilterQuery>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .dashboards
            .member_dashboard(principal.principal(), user_id, query.state),
    )
}

pub async fn benefit_detail(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, benefit)): Path<(String, String)>,
) -> axum::response::Response {
    let user_id = match errors::parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .dashboards
            .benefit_detail(principal.principal(), user_id, &benefit),
    )
}
