//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the context needed to build
//! meaningful log entries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during a reasoning call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The model endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    /// Non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// The endpoint answered, but the body was empty or unusable.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

/// How a failed turn is recorded in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnFailureKind {
    /// The call exceeded the per-turn timeout.
    Timeout,
    /// The service was unreachable or returned an error status.
    ServiceError,
    /// The service answered with nothing usable.
    MalformedResponse,
}

impl TurnFailureKind {
    /// Stable label used in synthetic failure messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnFailureKind::Timeout => "timeout",
            TurnFailureKind::ServiceError => "service_error",
            TurnFailureKind::MalformedResponse => "malformed_response",
        }
    }
}

impl InferenceError {
    /// Classify this error into the turn-failure taxonomy.
    pub fn failure_kind(&self) -> TurnFailureKind {
        match self {
            InferenceError::Timeout { .. } => TurnFailureKind::Timeout,
            InferenceError::MalformedResponse { .. } => TurnFailureKind::MalformedResponse,
            InferenceError::ConnectionFailed { .. }
            | InferenceError::HttpError { .. }
            | InferenceError::ConfigError { .. } => TurnFailureKind::ServiceError,
        }
    }
}
