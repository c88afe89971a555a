use axum::{Router, routing::get};

pub mod access;
pub mod admin;
pub mod common;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/apps", get(access::list_apps))
        .route("/me/dashboard", get(users::my_dashboard))
        .nest("/access", access::router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
}
