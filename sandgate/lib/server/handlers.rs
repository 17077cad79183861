//! HTTP request handlers for the REST API and the activation routes.
//!
//! The REST handlers coordinate with the lifecycle controller and the tool
//! executor and answer in the API envelope. The activation handlers hand the
//! raw request to the activation router and answer plain-text on failure,
//! matching what a generic HTTP client behind the proxy expects.

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{activation::error_status, sandbox::Sandbox, SandgateError};

use super::{
    data::{error_response, ApiData, StatusMessage, ToolCallRequest},
    state::ServerState,
};

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

/// Handler for the POST /api/v1/sandboxes endpoint
///
/// Creates a sandbox and waits for it to become ready.
pub async fn create_sandbox(
    State(state): State<ServerState>,
    Json(spec): Json<Sandbox>,
) -> Response {
    match state.controller().create(spec).await {
        Ok(sandbox) => (StatusCode::OK, Json(ApiData::new(sandbox))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handler for the GET /api/v1/sandboxes endpoint
///
/// Lists owned sandboxes from the backend cache.
pub async fn list_sandboxes(State(state): State<ServerState>) -> Response {
    match state.controller().list().await {
        Ok(sandboxes) => (StatusCode::OK, Json(ApiData::new(sandboxes))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handler for the GET /api/v1/sandboxes/{name} endpoint
///
/// Reads one sandbox from the source of truth.
pub async fn get_sandbox(State(state): State<ServerState>, Path(name): Path<String>) -> Response {
    match state.controller().get(&name).await {
        Ok(Some(sandbox)) => (StatusCode::OK, Json(ApiData::new(sandbox))).into_response(),
        Ok(None) => error_response(&SandgateError::NotFound(name)),
        Err(e) => error_response(&e),
    }
}

/// Handler for the DELETE /api/v1/sandboxes/{name} endpoint
///
/// Deletes a sandbox and its instances.
pub async fn delete_sandbox(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Response {
    match state.controller().delete(&name).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiData::new(StatusMessage::deleted(&name))),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handler for the GET /api/v1/sandboxes/{name}/tools endpoint
///
/// Lists the tools the sandbox exposes through its tool session.
pub async fn list_tools(State(state): State<ServerState>, Path(name): Path<String>) -> Response {
    match state.executor().list_tools(&name).await {
        Ok(tools) => (StatusCode::OK, Json(ApiData::new(tools))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handler for the POST /api/v1/sandboxes/{name}/tools/call endpoint
///
/// Invokes one tool inside the sandbox.
pub async fn call_tool(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    Json(request): Json<ToolCallRequest>,
) -> Response {
    match state
        .executor()
        .call_tool(&name, &request.tool_name, request.arguments)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(ApiData::new(outcome))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handler for the GET /api/v1/environments endpoint
///
/// Returns the configured environment catalog without image references.
pub async fn list_environments(State(state): State<ServerState>) -> Response {
    let summaries = state.environments().summaries();
    (StatusCode::OK, Json(ApiData::new(summaries))).into_response()
}

/// Handler for the GET /healthz endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Handler for the /sandbox/{name} activation route
pub async fn activate_root(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    req: Request,
) -> Response {
    activate(state, name, req).await
}

/// Handler for the /sandbox/{name}/{*rest} activation route
pub async fn activate_nested(
    State(state): State<ServerState>,
    Path((name, _rest)): Path<(String, String)>,
    req: Request,
) -> Response {
    activate(state, name, req).await
}

/// Proxies one request to the named sandbox, answering plain-text on failure.
async fn activate(state: ServerState, name: String, req: Request) -> Response {
    match state.router().activate(&name, req).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(sandbox = %name, "activation failed: {e}");
            (error_status(&e), e.to_string()).into_response()
        }
    }
}
