//! Vignette generation command.
//!
//! Gate on the caller, run one engine session, persist its artifact.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{Caller, CommandError};
use crate::agent_core::database::ArtifactStore;
use crate::agent_core::orchestrator::ConversationEngine;
use crate::agent_core::roster::Roster;
use crate::agent_core::types::{AgentRole, SelectionPolicy, SessionStatus};

// ─── Request / Response ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub topic: String,
    /// Round budget. Defaults to the engine's configured budget.
    #[serde(default)]
    pub max_rounds: Option<u32>,
    /// Role order for a custom roster of built-in agents.
    #[serde(default)]
    pub roles: Option<Vec<AgentRole>>,
    #[serde(default)]
    pub policy: Option<SelectionPolicy>,
}

impl GenerateRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            max_rounds: None,
            roles: None,
            policy: None,
        }
    }
}

/// What the caller gets back: the outcome plus the stored row id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVignette {
    pub id: i64,
    pub session_id: String,
    pub topic: String,
    pub status: SessionStatus,
    pub round_count: u32,
    pub initial_vignette: String,
    pub final_vignette: String,
    pub conversation: String,
}

// ─── Command ────────────────────────────────────────────────────────────────

/// Generate a vignette for an authenticated caller and save it.
///
/// The store lock is only taken after the session has finished, so it is
/// never held across a reasoning call.
pub async fn generate_vignette<S>(
    caller: &Caller,
    request: GenerateRequest,
    engine: &ConversationEngine,
    store: &Mutex<S>,
) -> Result<GeneratedVignette, CommandError>
where
    S: ArtifactStore + ?Sized,
{
    let owner_id = caller.require_owner()?;

    let roster = match &request.roles {
        Some(roles) => Roster::from_roles(roles)?,
        None => engine.default_roster().clone(),
    };
    let max_rounds = request.max_rounds.unwrap_or(engine.default_max_rounds());
    let policy = request.policy.unwrap_or(engine.policy());

    tracing::info!(
        owner_id,
        topic = %request.topic,
        max_rounds,
        policy = ?policy,
        "generate_vignette: starting"
    );

    let outcome = engine
        .generate_with_policy(&request.topic, max_rounds, roster, policy)
        .await?;

    let topic = request.topic.trim().to_string();
    let id = {
        let store = store.lock().map_err(|e| CommandError::Lock {
            reason: e.to_string(),
        })?;
        store.save(owner_id, &topic, &outcome.artifact)?
    };

    Ok(GeneratedVignette {
        id,
        session_id: outcome.session_id,
        topic,
        status: outcome.status,
        round_count: outcome.round_count,
        initial_vignette: outcome.artifact.initial_version,
        final_vignette: outcome.artifact.final_version,
        conversation: outcome.artifact.transcript_serialization,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::agent_core::database::VignetteDatabase;
    use crate::agent_core::errors::EngineError;
    use crate::agent_core::extractor::NO_FINAL_ARTIFACT;
    use crate::agent_core::termination::TerminationEvaluator;
    use crate::agent_core::test_support::{Scripted, ScriptedClient, FINAL_VIGNETTE};

    fn setup(client: Arc<ScriptedClient>) -> (ConversationEngine, Mutex<VignetteDatabase>) {
        let engine = ConversationEngine::new(
            client,
            SelectionPolicy::Adaptive,
            TerminationEvaluator::default(),
            Duration::from_secs(5),
        );
        let store = Mutex::new(VignetteDatabase::open(":memory:").unwrap());
        (engine, store)
    }

    #[tokio::test]
    async fn test_anonymous_rejected_without_calls() {
        let client = Arc::new(ScriptedClient::new());
        let (engine, store) = setup(client.clone());

        let err = generate_vignette(
            &Caller::Anonymous,
            GenerateRequest::new("Multiple Sclerosis"),
            &engine,
            &store,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CommandError::Unauthenticated));
        assert!(client.calls().is_empty());
        assert_eq!(store.lock().unwrap().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_generate_saves_artifact() {
        let client = Arc::new(
            ScriptedClient::new()
                .on("Vignette-Maker", Scripted::Reply("first draft".into()))
                .on("Show-Vignette", Scripted::Reply(FINAL_VIGNETTE.into())),
        );
        let (engine, store) = setup(client);

        let generated = generate_vignette(
            &Caller::authenticated("user-1"),
            GenerateRequest::new("  Multiple Sclerosis "),
            &engine,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(generated.status, SessionStatus::Completed);
        assert_eq!(generated.topic, "Multiple Sclerosis");
        assert_eq!(generated.initial_vignette, "first draft");
        assert_eq!(generated.final_vignette, FINAL_VIGNETTE);

        let saved = store.lock().unwrap().list_by_owner("user-1").unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, generated.id);
        assert_eq!(saved[0].conversation, generated.conversation);
    }

    #[tokio::test]
    async fn test_round_limit_outcome_is_still_saved() {
        let client = Arc::new(ScriptedClient::new());
        let (engine, store) = setup(client.clone());

        let request = GenerateRequest {
            max_rounds: Some(2),
            roles: Some(vec![AgentRole::Generator, AgentRole::Presenter]),
            policy: Some(SelectionPolicy::RoundRobin),
            ..GenerateRequest::new("Stroke")
        };
        let generated = generate_vignette(&Caller::authenticated("user-1"), request, &engine, &store)
            .await
            .unwrap();

        assert_eq!(generated.status, SessionStatus::RoundLimitReached);
        assert_eq!(generated.final_vignette, NO_FINAL_ARTIFACT);
        assert_eq!(client.calls(), vec!["Vignette-Maker", "Show-Vignette"]);
        assert_eq!(store.lock().unwrap().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_saves_nothing() {
        let client = Arc::new(ScriptedClient::new());
        let (engine, store) = setup(client.clone());

        let err = generate_vignette(
            &Caller::authenticated("user-1"),
            GenerateRequest::new("   "),
            &engine,
            &store,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Engine(EngineError::Configuration { .. })
        ));

        let request = GenerateRequest {
            roles: Some(vec![AgentRole::Generator, AgentRole::Generator]),
            ..GenerateRequest::new("Stroke")
        };
        let err = generate_vignette(&Caller::authenticated("user-1"), request, &engine, &store)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        assert!(client.calls().is_empty());
        assert_eq!(store.lock().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: GenerateRequest = serde_json::from_str(
            r#"{"topic":"Stroke","maxRounds":6,"roles":["generator","presenter"],"policy":"round_robin"}"#,
        )
        .unwrap();
        assert_eq!(request.max_rounds, Some(6));
        assert_eq!(request.roles.map(|r| r.len()), Some(2));
        assert_eq!(request.policy, Some(SelectionPolicy::RoundRobin));
    }
}
