//! Route definitions for the HTTP server.

use axum::{
    routing::{any, get, post},
    Router,
};

use super::{handlers, state::ServerState};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates the router with the REST API and the activation routes configured.
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/api/v1/sandboxes",
            post(handlers::create_sandbox).get(handlers::list_sandboxes),
        )
        .route(
            "/api/v1/sandboxes/{name}",
            get(handlers::get_sandbox).delete(handlers::delete_sandbox),
        )
        .route("/api/v1/sandboxes/{name}/tools", get(handlers::list_tools))
        .route(
            "/api/v1/sandboxes/{name}/tools/call",
            post(handlers::call_tool),
        )
        .route("/api/v1/environments", get(handlers::list_environments))
        .route("/healthz", get(handlers::health))
        .route("/sandbox/{name}", any(handlers::activate_root))
        .route("/sandbox/{name}/{*rest}", any(handlers::activate_nested))
        .with_state(state)
}
