//! HTTP API: routing and request/response mapping over the infra services.

pub mod app;
pub mod context;
pub mod middleware;
