//! Artifact extraction from a terminal transcript.
//!
//! Pure: reads the transcript, never performs I/O, never touches the session.

use super::errors::EngineError;
use super::transcript::Transcript;
use super::types::{AgentRole, Artifact};

/// Used when no Generator ever answered successfully.
pub const NO_INITIAL_ARTIFACT: &str = "no initial artifact produced";

/// Used when no Presenter ever answered successfully.
pub const NO_FINAL_ARTIFACT: &str = "no final artifact produced";

/// Derive the initial draft, the final presented version and the full
/// serialization.
///
/// Only serialization can fail; a missing role yields a sentinel instead.
pub fn extract(transcript: &Transcript) -> Result<Artifact, EngineError> {
    let initial_version = transcript
        .responses_by_role(AgentRole::Generator)
        .next()
        .map(|m| m.content.clone())
        .unwrap_or_else(|| NO_INITIAL_ARTIFACT.to_string());

    let final_version = transcript
        .responses_by_role(AgentRole::Presenter)
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_else(|| NO_FINAL_ARTIFACT.to_string());

    Ok(Artifact {
        initial_version,
        final_version,
        transcript_serialization: transcript.to_json()?,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
