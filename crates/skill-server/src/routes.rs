//! Route table for the container session server (spec §4.I's endpoint
//! table). Every route is wrapped in the bearer-auth layer; `build_router`
//! is the single place the HTTP surface is assembled, the way the teacher's
//! `skill-http::routes::create_app` composes its router.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers;
use crate::middleware::require_bearer_auth;
use crate::server::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/execute", post(handlers::execute))
        .route("/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .route("/tools", get(handlers::list_tools))
        .route("/tools/search", get(handlers::search_tools))
        .route("/skills", get(handlers::list_skills).post(handlers::create_skill))
        .route("/skills/search", get(handlers::search_skills))
        .route(
            "/skills/:name",
            get(handlers::get_skill).delete(handlers::delete_skill),
        )
        .route("/artifacts", get(handlers::list_artifacts).post(handlers::create_artifact))
        .route(
            "/artifacts/:name",
            get(handlers::get_artifact).delete(handlers::delete_artifact),
        )
        .route("/deps", get(handlers::list_deps).post(handlers::add_dep))
        .route("/deps/sync", post(handlers::sync_deps))
        .route("/deps/:name", delete(handlers::remove_dep))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_bearer_auth))
        .with_state(state)
}
