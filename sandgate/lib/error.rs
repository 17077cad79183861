//! `sandgate::error` is a module containing error utilities for the sandgate crate.

use std::{
    error::Error,
    fmt::{self, Display},
};

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Aliases
//--------------------------------------------------------------------------------------------------

/// A specialized `Result` type for the sandgate crate.
pub type SandgateResult<T> = Result<T, SandgateError>;

//--------------------------------------------------------------------------------------------------
// Types: Main
//--------------------------------------------------------------------------------------------------

/// The main error type of the sandgate crate.
#[derive(Debug, Error)]
pub enum SandgateError {
    /// A sandbox spec failed validation or manifest rendering.
    #[error("validation error: {0}")]
    Validation(String),

    /// A sandbox with the same name already exists.
    #[error("sandbox already exists: {0}")]
    AlreadyExists(String),

    /// The named sandbox or instance does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A sandbox did not become ready within the readiness window.
    #[error("sandbox not ready in time: {0}")]
    ReadinessTimeout(String),

    /// The orchestration backend failed to serve a request.
    #[error("backend error: {0}")]
    Backend(String),

    /// No instance appeared within the resolution window.
    #[error("endpoint resolution timed out: {0}")]
    ResolutionTimeout(String),

    /// The upstream instance failed while proxying.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The upstream instance did not produce response headers in time.
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// The per-sandbox wait queue is full.
    #[error("wait queue full for sandbox: {0}")]
    QueueFull(String),

    /// Establishing a tool session with an instance failed.
    #[error("session connect failed: {0}")]
    SessionConnect(String),

    /// The tool session returned a protocol-level error.
    #[error("session protocol error (code {code}): {message}")]
    SessionProtocol {
        /// Error code reported by the instance.
        code: i64,
        /// Error message reported by the instance.
        message: String,
    },

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization or deserialization error.
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An HTTP client error.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// An error building an HTTP message.
    #[error("http error: {0}")]
    Http(#[from] http::Error),

    /// Custom error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SandgateError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> SandgateError {
        SandgateError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> SandgateError {
        SandgateError::Validation(message.into())
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> SandgateError {
        SandgateError::Backend(message.into())
    }

    /// Creates an upstream error.
    pub fn upstream(message: impl Into<String>) -> SandgateError {
        SandgateError::Upstream(message.into())
    }
}

impl AnyError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> AnyError {
        AnyError {
            error: error.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl Error for AnyError {}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` result.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> SandgateResult<T> {
    Result::Ok(value)
}
