//! Conversation engine: drives one bounded, turn-based session.
//!
//! States:
//! 1. **Init**: validate the request and seed the transcript with the topic framing
//! 2. **SelectingSpeaker** then **AwaitingResponse**: pick an agent, run one reasoning call
//! 3. **Recording**: append exactly one message for the turn, success or failure
//! 4. **EvaluatingTermination**: stop on a well-formed presentation or an exhausted budget
//!
//! Turns are strictly sequential. A failed reasoning call never aborts the
//! session; it is recorded as a synthetic message and still uses up a round.
//! Only configuration problems (before the first turn) and broken internal
//! invariants surface as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::inference::client::ReasoningClient;
use crate::inference::config::EngineConfig;
use crate::inference::errors::InferenceError;

use super::errors::EngineError;
use super::extractor::extract;
use super::roster::Roster;
use super::selector::SpeakerSelector;
use super::termination::TerminationEvaluator;
use super::transcript::{preview, Transcript};
use super::types::{
    Agent, AgentId, AgentRole, EngineEvent, EngineState, GenerationOutcome, Message, MessageKind,
    NewMessage, SelectionPolicy, SessionStatus,
};

/// Upper bound on a session's round budget.
pub const MAX_ROUNDS_CEILING: u32 = 100;

/// Seed speaker when the roster has no Coordinator.
const FALLBACK_SEED_SPEAKER: &str = "coordinator";

// ─── Session ────────────────────────────────────────────────────────────────

/// State of a single generation request. Owned by the engine for the
/// duration of one `generate` call and never persisted.
#[derive(Debug)]
pub struct ConversationSession {
    id: String,
    topic: String,
    roster: Roster,
    transcript: Transcript,
    status: SessionStatus,
    round_count: u32,
    max_rounds: u32,
}

impl ConversationSession {
    /// Create a running session and append the seed message.
    fn start(topic: &str, roster: Roster, max_rounds: u32) -> Self {
        let (seed_id, seed_role) = match roster.by_role(AgentRole::Coordinator) {
            Some(coordinator) => (coordinator.id.clone(), coordinator.role),
            None => (AgentId::new(FALLBACK_SEED_SPEAKER), AgentRole::Coordinator),
        };

        let mut transcript = Transcript::new();
        transcript.append(NewMessage {
            speaker_id: seed_id,
            speaker_role: seed_role,
            content: roster.framing(topic),
            kind: MessageKind::Seed,
        });

        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            roster,
            transcript,
            status: SessionStatus::Running,
            round_count: 0,
            max_rounds,
        }
    }

    /// Leave `Running`. Allowed once.
    fn finish(&mut self, status: SessionStatus) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::invariant(format!(
                "session {} already finished as {}",
                self.id,
                self.status.as_str()
            )));
        }
        if !status.is_terminal() {
            return Err(EngineError::invariant("cannot finish a session as running"));
        }
        self.status = status;
        Ok(())
    }
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs conversation sessions against a shared reasoning client.
///
/// Holds no per-session state, so one engine can serve several sessions on
/// separate tasks.
pub struct ConversationEngine {
    client: Arc<dyn ReasoningClient>,
    policy: SelectionPolicy,
    evaluator: TerminationEvaluator,
    turn_timeout: Duration,
    default_roster: Roster,
    default_max_rounds: u32,
    events: Option<UnboundedSender<EngineEvent>>,
}

impl ConversationEngine {
    /// Engine with the built-in vignette roster and the default round budget.
    pub fn new(
        client: Arc<dyn ReasoningClient>,
        policy: SelectionPolicy,
        evaluator: TerminationEvaluator,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            client,
            policy,
            evaluator,
            turn_timeout,
            default_roster: Roster::usmle_vignette(),
            default_max_rounds: EngineConfig::default().max_rounds,
            events: None,
        }
    }

    /// Build an engine from the `engine:` config section.
    pub fn from_config(config: &EngineConfig, client: Arc<dyn ReasoningClient>) -> Result<Self, EngineError> {
        let default_roster = match &config.roster {
            Some(entries) => Roster::from_entries(entries)?,
            None => Roster::usmle_vignette(),
        };

        Ok(Self {
            client,
            policy: config.selection_policy,
            evaluator: TerminationEvaluator::from_config(&config.termination),
            turn_timeout: config.turn_timeout(),
            default_roster,
            default_max_rounds: config.max_rounds,
            events: None,
        })
    }

    /// Subscribe a channel to state-transition events.
    pub fn with_events(mut self, events: UnboundedSender<EngineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn default_roster(&self) -> &Roster {
        &self.default_roster
    }

    pub fn default_max_rounds(&self) -> u32 {
        self.default_max_rounds
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Run one session with the engine's selection policy.
    pub async fn generate(
        &self,
        topic: &str,
        max_rounds: u32,
        roster: Roster,
    ) -> Result<GenerationOutcome, EngineError> {
        self.generate_with_policy(topic, max_rounds, roster, self.policy)
            .await
    }

    /// Run one session with an explicit selection policy.
    pub async fn generate_with_policy(
        &self,
        topic: &str,
        max_rounds: u32,
        roster: Roster,
        policy: SelectionPolicy,
    ) -> Result<GenerationOutcome, EngineError> {
        let topic = topic.trim();
        if let Err(e) = validate_request(topic, max_rounds, &roster) {
            // No session is built, but subscribers still see it fail.
            let session_id = Uuid::new_v4().to_string();
            tracing::warn!(session_id = %session_id, error = %e, "engine: request rejected");
            self.send(&session_id, EngineState::Init, 0, None, None);
            self.send(&session_id, EngineState::Failed, 0, None, None);
            return Err(e);
        }

        let mut session = ConversationSession::start(topic, roster, max_rounds);

        tracing::info!(
            session_id = %session.id,
            topic = %session.topic,
            max_rounds,
            agents = session.roster.len(),
            policy = ?policy,
            "engine: session started"
        );
        self.emit(&session, EngineState::Init, None, session.transcript.last());

        let status = match self.run(&mut session, SpeakerSelector::new(policy)).await {
            Ok(status) => status,
            Err(e) => {
                // The session is still Running here, so this cannot fail.
                let _ = session.finish(SessionStatus::Failed);
                let transcript = session.transcript.to_json().unwrap_or_default();
                tracing::error!(
                    session_id = %session.id,
                    round = session.round_count,
                    error = %e,
                    transcript = %transcript,
                    "engine: session failed"
                );
                self.emit(&session, EngineState::Failed, None, None);
                return Err(e.with_transcript(transcript));
            }
        };

        session.finish(status)?;
        let terminal = match status {
            SessionStatus::Completed => EngineState::Completed,
            _ => EngineState::RoundLimitReached,
        };
        self.emit(&session, terminal, None, None);

        let artifact = extract(&session.transcript)?;

        tracing::info!(
            session_id = %session.id,
            status = status.as_str(),
            rounds = session.round_count,
            messages = session.transcript.len(),
            "engine: session finished"
        );

        Ok(GenerationOutcome {
            session_id: session.id,
            status,
            round_count: session.round_count,
            artifact,
        })
    }

    /// The turn loop. Returns the terminal status, or an invariant violation.
    async fn run(
        &self,
        session: &mut ConversationSession,
        selector: SpeakerSelector,
    ) -> Result<SessionStatus, EngineError> {
        loop {
            self.emit(session, EngineState::SelectingSpeaker, None, None);

            let agent = selector
                .select_next(&session.transcript, &session.roster)
                .cloned()
                .ok_or_else(|| {
                    EngineError::invariant(format!(
                        "no eligible speaker after {}",
                        session
                            .transcript
                            .last_speaker()
                            .map(AgentId::as_str)
                            .unwrap_or("<none>")
                    ))
                })?;

            if !session.roster.contains(&agent.id) {
                return Err(EngineError::invariant(format!(
                    "selected speaker '{}' is not in the roster",
                    agent.id
                )));
            }

            self.emit(session, EngineState::AwaitingResponse, Some(&agent.id), None);
            let turn = self.take_turn(session, &agent).await;

            session.round_count += 1;
            let recorded = session.transcript.append(turn).clone();
            self.emit(session, EngineState::Recording, Some(&agent.id), Some(&recorded));

            self.emit(session, EngineState::EvaluatingTermination, None, None);
            if self.evaluator.is_done(&session.transcript) {
                return Ok(SessionStatus::Completed);
            }
            if session.round_count >= session.max_rounds {
                return Ok(SessionStatus::RoundLimitReached);
            }
        }
    }

    /// One reasoning call under the turn timeout. Always yields a message.
    async fn take_turn(&self, session: &ConversationSession, agent: &Agent) -> NewMessage {
        let started = Instant::now();
        let round = session.round_count + 1;

        let result = match tokio::time::timeout(
            self.turn_timeout,
            self.client.complete(agent, &session.transcript),
        )
        .await
        {
            Ok(Ok(content)) if content.trim().is_empty() => Err(InferenceError::MalformedResponse {
                reason: "empty reply".into(),
            }),
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout {
                duration_ms: self.turn_timeout.as_millis() as u64,
            }),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(content) => {
                tracing::info!(
                    session_id = %session.id,
                    round,
                    speaker = %agent.id,
                    elapsed_ms,
                    preview = %preview(&content),
                    "engine: turn completed"
                );
                NewMessage {
                    speaker_id: agent.id.clone(),
                    speaker_role: agent.role,
                    content,
                    kind: MessageKind::Response,
                }
            }
            Err(e) => {
                let failure = e.failure_kind();
                tracing::warn!(
                    session_id = %session.id,
                    round,
                    speaker = %agent.id,
                    elapsed_ms,
                    failure = failure.as_str(),
                    error = %e,
                    "engine: turn failed"
                );
                NewMessage {
                    speaker_id: agent.id.clone(),
                    speaker_role: agent.role,
                    content: format!("[turn failed: {}] {e}", failure.as_str()),
                    kind: MessageKind::TurnFailure { failure },
                }
            }
        }
    }

    /// Log a transition and forward it to the subscriber, if any.
    fn emit(
        &self,
        session: &ConversationSession,
        state: EngineState,
        speaker_id: Option<&AgentId>,
        message: Option<&Message>,
    ) {
        self.send(&session.id, state, session.round_count, speaker_id, message);
    }

    fn send(
        &self,
        session_id: &str,
        state: EngineState,
        round: u32,
        speaker_id: Option<&AgentId>,
        message: Option<&Message>,
    ) {
        tracing::debug!(
            session_id,
            state = ?state,
            round,
            speaker = speaker_id.map(AgentId::as_str).unwrap_or(""),
            "engine: transition"
        );

        if let Some(tx) = &self.events {
            // A closed receiver must not affect the session.
            let _ = tx.send(EngineEvent {
                session_id: session_id.to_string(),
                state,
                round,
                speaker_id: speaker_id.cloned(),
                message: message.cloned(),
            });
        }
    }
}

/// Checks done before a session exists. Nothing is appended and no agent is
/// called when these fail.
fn validate_request(topic: &str, max_rounds: u32, roster: &Roster) -> Result<(), EngineError> {
    if topic.is_empty() {
        return Err(EngineError::configuration("topic is empty"));
    }
    if max_rounds == 0 || max_rounds > MAX_ROUNDS_CEILING {
        return Err(EngineError::configuration(format!(
            "max_rounds must be between 1 and {MAX_ROUNDS_CEILING}, got {max_rounds}"
        )));
    }
    if roster.is_empty() {
        return Err(EngineError::configuration("roster is empty"));
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
