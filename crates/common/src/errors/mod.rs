//! Error types for Ragline
//!
//! Two layers:
//! - `AppError`: failures raised by a single component (embedding client,
//!   vector index, completion client, configuration)
//! - `QueryError`: the orchestrator's view, tagging each failure with the
//!   pipeline stage it happened in
//!
//! Both carry a machine-readable `ErrorCode` and an HTTP status mapping so the
//! gateway can render them without inspecting internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Caller errors (1xxx)
    ValidationError,
    NoContext,

    // Backend errors (8xxx)
    BackendError,
    TimeoutError,
    ProtocolError,

    // Deployment errors (9xxx)
    DimensionError,
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::NoContext => 1002,

            ErrorCode::BackendError => 8001,
            ErrorCode::TimeoutError => 8002,
            ErrorCode::ProtocolError => 8003,

            ErrorCode::DimensionError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::InternalError => 9003,
        }
    }
}

/// Component-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller-fixable input problem. No backend was contacted.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The backend was reached (or should have been) and reported failure.
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{backend} backend timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },

    /// The backend answered, but not in the shape we expect.
    #[error("{backend} protocol error: {message}")]
    Protocol { backend: String, message: String },

    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Classify a `reqwest` transport failure for the named backend
    pub fn from_transport(backend: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout {
                backend: backend.to_string(),
                timeout_ms,
            }
        } else if err.is_decode() {
            AppError::Protocol {
                backend: backend.to_string(),
                message: format!("Failed to parse response: {}", err),
            }
        } else {
            AppError::Backend {
                backend: backend.to_string(),
                status: err.status().map(|s| s.as_u16()),
                message: format!("Request failed: {}", err),
            }
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::Backend { .. } => ErrorCode::BackendError,
            AppError::Timeout { .. } => ErrorCode::TimeoutError,
            AppError::Protocol { .. } => ErrorCode::ProtocolError,
            AppError::Dimension { .. } => ErrorCode::DimensionError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) | AppError::Io(_) | AppError::Other(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Short class name used in user-facing messages
    fn summary(&self) -> String {
        match self {
            AppError::Validation { message } => message.clone(),
            AppError::Backend {
                backend,
                status: Some(status),
                ..
            } => format!("{} backend returned status {}", backend, status),
            AppError::Backend { backend, .. } => format!("{} backend unavailable", backend),
            AppError::Timeout {
                backend,
                timeout_ms,
            } => format!("{} backend timed out after {}ms", backend, timeout_ms),
            AppError::Protocol { backend, .. } => {
                format!("{} backend returned an unexpected response", backend)
            }
            AppError::Dimension { .. } => "embedding dimension does not match the index".into(),
            AppError::Configuration { .. } => "service is misconfigured".into(),
            AppError::Serialization(_) | AppError::Io(_) | AppError::Other(_) => {
                "internal error".into()
            }
        }
    }
}

/// Pipeline stage in which a query failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Retrieval,
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Retrieval => "retrieval",
            Stage::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// Orchestrator-level error: which stage failed, and why
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Retrieval ran but produced nothing and the pipeline requires grounding.
    #[error("Retrieval failed: no relevant context found")]
    NoContext,

    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] AppError),

    #[error("Generation failed: {0}")]
    Generation(#[source] AppError),
}

impl QueryError {
    pub fn stage(&self) -> Stage {
        match self {
            QueryError::Validation(_) => Stage::Validation,
            QueryError::NoContext | QueryError::Retrieval(_) => Stage::Retrieval,
            QueryError::Generation(_) => Stage::Generation,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            QueryError::Validation(_) => ErrorCode::ValidationError,
            QueryError::NoContext => ErrorCode::NoContext,
            QueryError::Retrieval(e) | QueryError::Generation(e) => e.code(),
        }
    }

    /// The underlying component error, if any
    pub fn cause(&self) -> Option<&AppError> {
        match self {
            QueryError::Retrieval(e) | QueryError::Generation(e) => Some(e),
            _ => None,
        }
    }

    /// Message safe to show to callers: names the stage, never echoes backend bodies
    pub fn user_message(&self) -> String {
        match self {
            QueryError::Validation(message) => message.clone(),
            QueryError::NoContext => "Retrieval failed: no relevant context found".to_string(),
            QueryError::Retrieval(e) => format!("Retrieval failed: {}", e.summary()),
            QueryError::Generation(e) => format!("Generation failed: {}", e.summary()),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NoContext => StatusCode::NOT_FOUND,
            ErrorCode::BackendError | ErrorCode::ProtocolError => StatusCode::BAD_GATEWAY,
            ErrorCode::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::DimensionError
            | ErrorCode::ConfigurationError
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Error body returned to callers; matches the `{ "error": ... }` arm of `QueryResponse`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
    pub stage: Stage,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let stage = self.stage();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                stage = %stage,
                status = status.as_u16(),
                "Query failed"
            );
        } else {
            tracing::warn!(
                error = %self,
                code = ?code,
                stage = %stage,
                status = status.as_u16(),
                "Query rejected"
            );
        }

        let body = ErrorResponse {
            error: self.user_message(),
            code,
            stage,
        };

        (status, Json(body)).into_response()
    }
}
