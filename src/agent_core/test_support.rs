//! Scripted reasoning client for engine tests.
//!
//! Each agent id gets its own queue of scripted outcomes. An agent with an
//! empty queue answers with a neutral one-line note, so tests only script the
//! turns they care about.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::inference::client::ReasoningClient;
use crate::inference::errors::InferenceError;

use super::transcript::Transcript;
use super::types::Agent;

/// One scripted outcome for a single call.
pub(crate) enum Scripted {
    Reply(String),
    Fail(InferenceError),
    /// Sleep before replying. Used to trip the engine's turn timeout.
    Stall(Duration),
}

#[derive(Default)]
pub(crate) struct ScriptedClient {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next unscripted call by `agent_id`.
    pub(crate) fn on(self, agent_id: &str, outcome: Scripted) -> Self {
        if let Ok(mut queues) = self.queues.lock() {
            queues
                .entry(agent_id.to_string())
                .or_default()
                .push_back(outcome);
        }
        self
    }

    /// Agent ids in call order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningClient for ScriptedClient {
    async fn complete(&self, agent: &Agent, _transcript: &Transcript) -> Result<String, InferenceError> {
        let id = agent.id.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(id.clone());
        }

        let next = self
            .queues
            .lock()
            .ok()
            .and_then(|mut q| q.get_mut(&id).and_then(VecDeque::pop_front));

        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(format!("{id} answered late"))
            }
            None => Ok(format!("{id} has no further comments.")),
        }
    }
}

/// A Presenter reply that satisfies the default termination markers.
pub(crate) const FINAL_VIGNETTE: &str = "{\n\
   'question': ['A 29-year-old woman presents with painful monocular vision loss ...'],\n\
   'correct_answer': ['Optic neuritis'],\n\
   'incorrect_answers': ['Central retinal artery occlusion', 'Glaucoma'],\n\
}";
