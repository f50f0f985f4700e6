//! Transcript: the append-only record of a conversation session.
//!
//! Responsibilities:
//! - Assign sequence numbers and timestamps at append time
//! - Render the conversation as reasoning context for a given agent
//! - Serialize losslessly to JSON and rebuild from that serialization

use chrono::Utc;

use crate::inference::types::ChatMessage;

use super::errors::EngineError;
use super::types::{Agent, AgentId, AgentRole, Message, MessageKind, NewMessage};

/// Byte cap for message previews in logs.
const PREVIEW_BYTES: usize = 120;

/// Ordered, append-only sequence of messages owned by one session.
///
/// There is no way to remove, reorder or edit a message once appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, assigning the next sequence number and a timestamp.
    pub fn append(&mut self, msg: NewMessage) -> &Message {
        let sequence_number = self.messages.len() as u64;
        self.messages.push(Message {
            sequence_number,
            speaker_id: msg.speaker_id,
            speaker_role: msg.speaker_role,
            content: msg.content,
            timestamp: Utc::now(),
            kind: msg.kind,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Who produced the most recent message.
    pub fn last_speaker(&self) -> Option<&AgentId> {
        self.messages.last().map(|m| &m.speaker_id)
    }

    /// Who took the most recent turn. The seed is not a turn.
    pub fn last_turn_speaker(&self) -> Option<&AgentId> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.kind != MessageKind::Seed)
            .map(|m| &m.speaker_id)
    }

    /// Successful responses from agents with the given role, in order.
    pub fn responses_by_role(&self, role: AgentRole) -> impl Iterator<Item = &Message> + '_ {
        self.messages
            .iter()
            .filter(move |m| m.speaker_role == role && m.is_response())
    }

    // ─── Context Rendering ──────────────────────────────────────────────

    /// Build the `Vec<ChatMessage>` sent to the reasoning client for `agent`.
    ///
    /// The agent's contract is the system message. Every prior message is
    /// labelled with its speaker; the agent's own earlier replies go back as
    /// assistant turns so the model sees its own voice.
    pub fn build_chat_messages(&self, agent: &Agent) -> Vec<ChatMessage> {
        let mut chat_messages = Vec::with_capacity(self.messages.len() + 1);
        chat_messages.push(ChatMessage::system(agent.prompt_contract.clone()));

        for msg in &self.messages {
            if msg.speaker_id == agent.id && msg.is_response() {
                chat_messages.push(ChatMessage::assistant(msg.content.clone()));
            } else {
                chat_messages.push(ChatMessage::user(format!(
                    "[{}] {}",
                    msg.speaker_id, msg.content
                )));
            }
        }

        chat_messages
    }

    // ─── Serialization ──────────────────────────────────────────────────

    /// Lossless, pretty-printed JSON of every message in order.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }

    /// Rebuild a transcript from [`Transcript::to_json`] output.
    ///
    /// Rejects input whose sequence numbers are not exactly `0..n`, since
    /// such a log could not have been produced by `append`.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let messages: Vec<Message> = serde_json::from_str(json)?;

        for (expected, msg) in messages.iter().enumerate() {
            if msg.sequence_number != expected as u64 {
                return Err(EngineError::Serialization {
                    reason: format!(
                        "sequence gap: expected {expected}, found {}",
                        msg.sequence_number
                    ),
                });
            }
        }

        Ok(Self { messages })
    }
}

/// Truncate `s` to at most `max_bytes`, respecting char boundaries.
pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Short single-line preview of message content for log fields.
pub(crate) fn preview(content: &str) -> String {
    let flat = content.replace('\n', " ");
    if flat.len() > PREVIEW_BYTES {
        format!("{}…", truncate_utf8(&flat, PREVIEW_BYTES))
    } else {
        flat
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
