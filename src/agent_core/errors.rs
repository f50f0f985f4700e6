//! Agent Core error types.

use thiserror::Error;

/// Errors that can occur during engine and persistence operations.
///
/// Turn failures are deliberately absent: they are recorded in the
/// transcript and never escape the conversation loop.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid topic, round budget or roster. The session never starts.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// An internal invariant broke mid-run (e.g. a speaker outside the roster).
    ///
    /// `transcript` holds the session's serialized messages up to the failure.
    #[error("invariant violation: {reason}")]
    InvariantViolation {
        reason: String,
        transcript: Option<String>,
    },

    /// Database operation failed.
    #[error("database error: {reason}")]
    Database { reason: String },

    /// Serialization error.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl EngineError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        EngineError::InvariantViolation {
            reason: reason.into(),
            transcript: None,
        }
    }

    /// Attach a session transcript to an invariant violation. Other
    /// variants are returned unchanged.
    pub(crate) fn with_transcript(self, json: String) -> Self {
        match self {
            EngineError::InvariantViolation { reason, .. } => EngineError::InvariantViolation {
                reason,
                transcript: Some(json),
            },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization {
            reason: e.to_string(),
        }
    }
}
