//! Inference: OpenAI-compatible reasoning client and configuration.
//!
//! This module handles all communication with the model endpoint:
//! - The `ReasoningClient` seam the engine calls once per turn
//! - An HTTP implementation speaking the Chat Completions API
//! - Failure classification into the turn-failure taxonomy
//! - Configuration loading from `config.yaml`
//!
//! Switching models, or pinning one agent to a dedicated model, is a config
//! change, not a code change.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::{InferenceClient, ReasoningClient};
pub use config::{EngineConfig, ForgeConfig, ModelConfig, TerminationConfig};
pub use errors::{InferenceError, TurnFailureKind};
pub use types::{ChatMessage, Role, SamplingOverrides};
