//! Wire types for the reasoning client.
//!
//! These mirror the OpenAI Chat Completions API types, used for both
//! request building and response parsing.

use serde::{Deserialize, Serialize};

use super::errors::InferenceError;

// ─── Request Types ───────────────────────────────────────────────────────────

/// A single message in the rendered conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Optional sampling parameter overrides for a single reasoning call.
///
/// Classifier agents run with temperature 0 so their labels stay stable
/// across replays.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingOverrides {
    /// Override temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: Option<f32>,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Non-streaming completion response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Parse a non-streaming response body into the reply text.
///
/// An unparseable body, a body without choices, or a blank first choice are
/// all `MalformedResponse`: the service answered but gave nothing a turn can
/// be built from.
pub fn parse_completion_text(body: &str) -> Result<String, InferenceError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse {
            reason: format!("invalid completion JSON: {e}"),
        })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::MalformedResponse {
            reason: "response contained no choices".to_string(),
        })?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(InferenceError::MalformedResponse {
            reason: format!(
                "empty content (finish_reason: {})",
                choice.finish_reason.as_deref().unwrap_or("none")
            ),
        }),
    }
}
