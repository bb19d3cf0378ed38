use axum::Router;
use domain_identity::handlers;
use std::sync::Arc;

pub mod health;

/// Identity routes, already carrying their state.
///
/// Paths are absolute (`/api/...`, `/wiki/info`), so nothing is nested here.
pub fn routes(state: &crate::state::AppState) -> Router {
    handlers::router(Arc::clone(&state.identity))
}

/// Creates a router with the /ready endpoint that checks the directory.
///
/// This router has state applied and can be merged with the stateless app router
/// from `create_router`.
pub fn ready_router(state: crate::state::AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
