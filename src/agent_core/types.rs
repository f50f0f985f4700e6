//! Shared types for the agent core.
//!
//! Agents, transcript messages, session status, engine events and the
//! extracted artifact used across the selector, evaluator, orchestrator and
//! persistence layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inference::errors::TurnFailureKind;

// ─── Agents ─────────────────────────────────────────────────────────────────

/// Stable agent identifier, unique within a roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The part an agent plays in the vignette workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Drafts and revises the vignette.
    Generator,
    /// Checks domain accuracy (anatomy, findings, laterality).
    CheckerContent,
    /// Checks item-writing standards and distractor quality.
    CheckerFormat,
    /// Classifies the item against the content outline.
    Labeler,
    /// Presents the final revised vignette.
    Presenter,
    /// Frames the task; owns the seed message.
    Coordinator,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Generator => "generator",
            AgentRole::CheckerContent => "checker_content",
            AgentRole::CheckerFormat => "checker_format",
            AgentRole::Labeler => "labeler",
            AgentRole::Presenter => "presenter",
            AgentRole::Coordinator => "coordinator",
        }
    }

    /// Roles that review a draft between the Generator and the Presenter.
    pub fn is_reviewer(&self) -> bool {
        matches!(
            self,
            AgentRole::CheckerContent | AgentRole::CheckerFormat | AgentRole::Labeler
        )
    }
}

/// Whether an agent answers freely or classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    #[default]
    Responder,
    /// Invoked with deterministic sampling.
    Classifier,
}

/// A participant: identity plus a fixed behavioural contract.
///
/// Agents are plain data. Display of what they say is handled by engine
/// event subscribers, never by the agent itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub role: AgentRole,
    pub prompt_contract: String,
    #[serde(default)]
    pub capability: Capability,
    /// Model key this agent is pinned to; `None` uses the active model.
    #[serde(default)]
    pub model: Option<String>,
}

impl Agent {
    pub fn new(id: impl Into<String>, role: AgentRole, prompt_contract: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(id),
            role,
            prompt_contract: prompt_contract.into(),
            capability: Capability::Responder,
            model: None,
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

// ─── Messages ───────────────────────────────────────────────────────────────

/// What produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// The Coordinator's topic framing at sequence 0.
    Seed,
    /// A successful reasoning call.
    Response,
    /// A synthetic record of a failed turn.
    TurnFailure { failure: TurnFailureKind },
}

/// A single immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Assigned at append time; 0 for the seed, gap-free after.
    pub sequence_number: u64,
    pub speaker_id: AgentId,
    pub speaker_role: AgentRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl Message {
    pub fn is_response(&self) -> bool {
        self.kind == MessageKind::Response
    }
}

/// A message that has not yet been given a position in a transcript.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub speaker_id: AgentId,
    pub speaker_role: AgentRole,
    pub content: String,
    pub kind: MessageKind,
}

// ─── Sessions ───────────────────────────────────────────────────────────────

/// Lifecycle status of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    /// A well-formed Presenter message ended the conversation.
    Completed,
    /// The round budget ran out first. A legitimate, best-effort outcome.
    RoundLimitReached,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::RoundLimitReached => "round_limit_reached",
            SessionStatus::Failed => "failed",
        }
    }
}

/// How the next speaker is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Strict cycle through roster order.
    RoundRobin,
    /// Route by workflow stage inferred from the transcript.
    #[default]
    Adaptive,
}

// ─── Engine Events ──────────────────────────────────────────────────────────

/// Orchestrator state-machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Init,
    SelectingSpeaker,
    AwaitingResponse,
    Recording,
    EvaluatingTermination,
    Completed,
    RoundLimitReached,
    Failed,
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineState::Completed | EngineState::RoundLimitReached | EngineState::Failed
        )
    }
}

/// Progress notification emitted on every state transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    pub session_id: String,
    pub state: EngineState,
    /// Rounds taken when the event was emitted.
    pub round: u32,
    /// Selected speaker, for `AwaitingResponse`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<AgentId>,
    /// The message just recorded, for `Init` (seed) and `Recording`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

// ─── Artifacts ──────────────────────────────────────────────────────────────

/// The extracted result of a terminal session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub initial_version: String,
    pub final_version: String,
    pub transcript_serialization: String,
}

/// What `generate` hands back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub session_id: String,
    pub status: SessionStatus,
    pub round_count: u32,
    pub artifact: Artifact,
}

/// A persisted artifact, as listed back to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedVignette {
    pub id: i64,
    pub owner_id: String,
    pub topic: String,
    pub initial_version: String,
    pub final_version: String,
    pub conversation: String,
    /// ISO 8601 timestamp.
    pub created_at: String,
}

// ─── Tests ──────────────────────────────────────────────────────────────────
