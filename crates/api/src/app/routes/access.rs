use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use guildhall_auth::{SelfServiceAction, require_self_or_admin};
use guildhall_core::UserId;

use crate::app::routes::common::{forbidden, respond};
use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(app_decisions))
        .route("/landing", get(landing))
        .route("/:app", get(explain))
}

/// Caller, or the `user_id` in the query when the caller may view that user.
fn subject(principal: &PrincipalContext, query: &dto::AccessQuery) -> Result<UserId, axum::response::Response> {
    let Some(raw) = query.user_id.as_deref() else {
        return Ok(principal.user_id());
    };
    let target = errors::parse_user_id(raw)?;
    require_self_or_admin(principal.principal(), target, SelfServiceAction::ViewProfile).map_err(forbidden)?;
    Ok(target)
}

pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(app): Path<String>,
    Query(query): Query<dto::AccessQuery>,
) -> axum::response::Response {
    let user_id = match subject(&principal, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.access.explain(user_id, &app))
}

pub async fn app_decisions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AccessQuery>,
) -> axum::response::Response {
    let user_id = match subject(&principal, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.access.app_decisions(user_id) {
        Ok(decisions) => {
            let items = decisions
                .into_iter()
                .map(|(app, decision)| {
                    json!({
                        "key": app.key,
                        "name": app.name,
                        "granted": decision.granted,
                        "reason": decision.reason,
                    })
                })
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn landing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    respond(StatusCode::OK, services.access.landing(principal.user_id()))
}

pub async fn list_apps(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.accounts.list_apps() {
        Ok(apps) => (StatusCode::OK, Json(json!({ "items": apps }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
