//! Speaker selection.
//!
//! Two policies share one rule: the agent that took the previous turn is
//! never picked again for the next one. When a policy lands on that agent,
//! selection walks forward through roster order to the next eligible member.
//! The seed is framing, not a turn, so its owner may speak first. A one-agent
//! roster is exempt, otherwise it could never take a second turn.

use super::roster::Roster;
use super::transcript::Transcript;
use super::types::{Agent, AgentId, AgentRole, MessageKind, SelectionPolicy};

/// Picks the next agent to act. Stateless: the same transcript and roster
/// always produce the same choice.
#[derive(Debug, Clone, Copy)]
pub struct SpeakerSelector {
    policy: SelectionPolicy,
}

impl SpeakerSelector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Choose the next speaker, or `None` when no roster member is eligible.
    pub fn select_next<'r>(&self, transcript: &Transcript, roster: &'r Roster) -> Option<&'r Agent> {
        if roster.is_empty() {
            return None;
        }

        let candidate = match self.policy {
            SelectionPolicy::RoundRobin => round_robin_candidate(transcript, roster),
            SelectionPolicy::Adaptive => adaptive_candidate(transcript, roster),
        };

        let idx = apply_no_repeat(candidate, transcript.last_turn_speaker(), roster)?;
        roster.agents().get(idx)
    }
}

/// Turns taken so far (every message except the seed).
fn turns_taken(transcript: &Transcript) -> usize {
    transcript
        .messages()
        .iter()
        .filter(|m| m.kind != MessageKind::Seed)
        .count()
}

/// Turn *k* belongs to `roster[k mod n]`.
fn round_robin_candidate(transcript: &Transcript, roster: &Roster) -> usize {
    turns_taken(transcript) % roster.len()
}

/// Route by workflow stage.
///
/// Stages run author → reviewers (roster order) → presenter. The candidate is
/// the first stage whose agent has not answered successfully since the
/// latest successful draft. Once everyone has, the author revises.
fn adaptive_candidate(transcript: &Transcript, roster: &Roster) -> usize {
    let agents = roster.agents();

    let mut pipeline: Vec<usize> = Vec::with_capacity(agents.len());
    pipeline.extend(agents.iter().position(|a| a.role == AgentRole::Generator));
    pipeline.extend(
        agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.role.is_reviewer())
            .map(|(i, _)| i),
    );
    pipeline.extend(agents.iter().position(|a| a.role == AgentRole::Presenter));

    if pipeline.is_empty() {
        return round_robin_candidate(transcript, roster);
    }

    let latest_draft = transcript
        .responses_by_role(AgentRole::Generator)
        .last()
        .map(|m| m.sequence_number);

    let answered_since_draft = |agent: &Agent| {
        transcript.messages().iter().any(|m| {
            m.speaker_id == agent.id
                && m.is_response()
                && latest_draft.map_or(true, |seq| m.sequence_number > seq)
        })
    };

    for &idx in &pipeline {
        let agent = &agents[idx];
        let satisfied = match agent.role {
            AgentRole::Generator => latest_draft.is_some(),
            _ => answered_since_draft(agent),
        };
        if !satisfied {
            return idx;
        }
    }

    pipeline[0]
}

/// Enforce no-repeat-speaker starting from `candidate`.
fn apply_no_repeat(candidate: usize, last: Option<&AgentId>, roster: &Roster) -> Option<usize> {
    let n = roster.len();
    if n == 1 {
        return Some(0);
    }

    (0..n)
        .map(|offset| (candidate + offset) % n)
        .find(|&idx| Some(&roster.agents()[idx].id) != last)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
