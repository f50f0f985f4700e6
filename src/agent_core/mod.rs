//! Agent Core: the conversation engine behind vignette generation.
//!
//! Submodules:
//! - `types`: Agents, messages, session status, events and artifacts
//! - `roster`: Built-in agents and roster construction/validation
//! - `transcript`: Append-only message log, context rendering, JSON round-trip
//! - `selector`: Round-robin and adaptive speaker selection (no repeat speaker)
//! - `termination`: Detects a well-formed final presentation
//! - `orchestrator`: `ConversationEngine` state machine with per-turn timeout
//! - `extractor`: Initial/final artifact extraction with sentinels
//! - `database`: `ArtifactStore` seam and its SQLite implementation
//! - `errors`: Engine-level error types

pub mod database;
pub mod errors;
pub mod extractor;
pub mod orchestrator;
pub mod roster;
pub mod selector;
pub mod termination;
pub mod transcript;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use database::{ArtifactStore, VignetteDatabase};
pub use errors::EngineError;
pub use orchestrator::{ConversationEngine, MAX_ROUNDS_CEILING};
pub use roster::Roster;
pub use selector::SpeakerSelector;
pub use termination::TerminationEvaluator;
pub use transcript::Transcript;
pub use types::{
    Agent, AgentId, AgentRole, Artifact, Capability, EngineEvent, EngineState, GenerationOutcome,
    Message, MessageKind, SavedVignette, SelectionPolicy, SessionStatus,
};
