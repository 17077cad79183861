//! Request and response bodies of the REST API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SandgateError;

//--------------------------------------------------------------------------------------------------
// Types: Requests
//--------------------------------------------------------------------------------------------------

/// Request body for invoking a tool inside a sandbox.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool to invoke.
    pub tool_name: String,

    /// Tool arguments, passed through as-is.
    #[serde(default)]
    pub arguments: Value,
}

//--------------------------------------------------------------------------------------------------
// Types: Responses
//--------------------------------------------------------------------------------------------------

/// Success envelope wrapping every API payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiData<T> {
    /// Application-level result code. `"0"` on success.
    pub code: String,

    /// The payload.
    pub data: T,
}

/// Response body for operations that only report an outcome message.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Human-readable outcome.
    pub message: String,
}

/// Standard error response format.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub code: u16,

    /// Error message.
    pub message: String,

    /// Error type for categorizing errors.
    pub error_type: ErrorType,
}

/// Types of errors the API reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Invalid request parameters or body.
    ValidationError,

    /// A sandbox with the same name already exists.
    AlreadyExists,

    /// Resource not found.
    NotFound,

    /// The sandbox did not become ready in time.
    ReadinessTimeout,

    /// No live instance could be resolved in time.
    ResolutionTimeout,

    /// The admission queue for the sandbox is full.
    QueueFull,

    /// The resolved instance failed or timed out.
    UpstreamError,

    /// The tool session could not be established or misbehaved.
    SessionError,

    /// The orchestration backend failed.
    BackendError,

    /// Internal server errors.
    InternalError,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T> ApiData<T> {
    /// Wraps a payload in the success envelope.
    pub fn new(data: T) -> Self {
        Self {
            code: "0".to_string(),
            data,
        }
    }
}

impl StatusMessage {
    /// Builds a deletion outcome message.
    pub fn deleted(name: &str) -> Self {
        Self {
            message: format!("sandbox {name} deleted"),
        }
    }
}

impl ErrorBody {
    /// Categorizes a gateway error and picks its HTTP status.
    pub fn from_error(error: &SandgateError) -> (StatusCode, Self) {
        let (status, error_type) = match error {
            SandgateError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorType::ValidationError),
            SandgateError::AlreadyExists(_) => (StatusCode::CONFLICT, ErrorType::AlreadyExists),
            SandgateError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorType::NotFound),
            SandgateError::ReadinessTimeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, ErrorType::ReadinessTimeout)
            }
            SandgateError::ResolutionTimeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, ErrorType::ResolutionTimeout)
            }
            SandgateError::QueueFull(_) => (StatusCode::SERVICE_UNAVAILABLE, ErrorType::QueueFull),
            SandgateError::Upstream(_) => (StatusCode::BAD_GATEWAY, ErrorType::UpstreamError),
            SandgateError::UpstreamTimeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, ErrorType::UpstreamError)
            }
            SandgateError::SessionConnect(_) | SandgateError::SessionProtocol { .. } => {
                (StatusCode::BAD_GATEWAY, ErrorType::SessionError)
            }
            SandgateError::Backend(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorType::BackendError)
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorType::InternalError),
        };

        let body = Self {
            code: status.as_u16(),
            message: error.to_string(),
            error_type,
        };

        (status, body)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Renders a gateway error as the API error response.
pub fn error_response(error: &SandgateError) -> Response {
    let (status, body) = ErrorBody::from_error(error);
    (status, Json(body)).into_response()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
