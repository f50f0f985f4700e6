//! OpenAI-compatible reasoning client.
//!
//! Sends one non-streaming chat completion per turn. The engine owns the
//! per-turn timeout and decides what a failure means for the session, so the
//! client makes exactly one attempt and never falls back to another model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::config::{resolve_active_model, ForgeConfig, ModelConfig};
use super::errors::InferenceError;
use super::types::{parse_completion_text, ChatCompletionRequest, SamplingOverrides};
use crate::agent_core::transcript::Transcript;
use crate::agent_core::types::{Agent, Capability};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport-level ceiling. Set above the engine's default turn timeout so
/// the engine's own timeout normally fires first.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

// ─── Seam ────────────────────────────────────────────────────────────────────

/// Produces one agent's next contribution given the conversation so far.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn complete(&self, agent: &Agent, transcript: &Transcript) -> Result<String, InferenceError>;
}

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// HTTP implementation of [`ReasoningClient`].
pub struct InferenceClient {
    http: HttpClient,
    config: ForgeConfig,
    /// The active model key, used when an agent is not pinned.
    active_model_key: String,
    request_timeout: Duration,
}

impl InferenceClient {
    /// Create a client from the configuration.
    ///
    /// Resolves the active model. Does NOT check connectivity; that happens
    /// on the first request or via [`InferenceClient::health_check`].
    pub fn from_config(config: ForgeConfig) -> Result<Self, InferenceError> {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    /// Same as [`InferenceClient::from_config`] with a custom transport timeout.
    pub fn with_timeout(config: ForgeConfig, request_timeout: Duration) -> Result<Self, InferenceError> {
        let (key, model) = resolve_active_model(&config)?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: model.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            active_model_key: key,
            request_timeout,
        })
    }

    /// The display name of the active model.
    pub fn active_model_name(&self) -> &str {
        self.config
            .models
            .get(&self.active_model_key)
            .map(|m| m.display_name.as_str())
            .unwrap_or(self.active_model_key.as_str())
    }

    /// Resolve the model an agent runs on: its pinned key, else the active one.
    fn model_for(&self, agent: &Agent) -> Result<(&str, &ModelConfig), InferenceError> {
        let key = agent.model.as_deref().unwrap_or(&self.active_model_key);
        self.config
            .models
            .get_key_value(key)
            .map(|(k, m)| (k.as_str(), m))
            .ok_or_else(|| InferenceError::ConfigError {
                reason: format!("model '{key}' not found in config"),
            })
    }

    /// Sampling for an agent. Classifiers run deterministically.
    fn sampling_for(agent: &Agent) -> SamplingOverrides {
        match agent.capability {
            Capability::Classifier => SamplingOverrides {
                temperature: Some(0.0),
            },
            Capability::Responder => SamplingOverrides::default(),
        }
    }

    fn build_request(
        &self,
        agent: &Agent,
        transcript: &Transcript,
    ) -> Result<(String, ChatCompletionRequest, Option<String>), InferenceError> {
        let (key, model) = self.model_for(agent)?;
        let sampling = Self::sampling_for(agent);

        let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));
        let body = ChatCompletionRequest {
            model: model.model_name.clone().unwrap_or_else(|| key.to_string()),
            messages: transcript.build_chat_messages(agent),
            temperature: sampling.temperature.unwrap_or(model.temperature),
            max_tokens: model.max_tokens,
            stream: false,
        };
        let api_key = model.api_key.clone().filter(|k| !k.trim().is_empty());

        Ok((url, body, api_key))
    }

    // ─── Health Check ────────────────────────────────────────────────────

    /// Check if the active model endpoint is reachable. Does not consume
    /// inference tokens.
    pub async fn health_check(&self) -> Result<bool, InferenceError> {
        let model = self
            .config
            .models
            .get(&self.active_model_key)
            .ok_or_else(|| InferenceError::ConfigError {
                reason: format!("model '{}' not found in config", self.active_model_key),
            })?;
        let url = format!("{}/models", model.base_url.trim_end_matches('/'));

        let mut request = self.http.get(&url).timeout(CONNECT_TIMEOUT);
        if let Some(key) = model.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Map a transport error onto the inference taxonomy.
fn map_send_error(e: reqwest::Error, url: &str, timeout: Duration) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout {
            duration_ms: timeout.as_millis() as u64,
        }
    } else {
        InferenceError::ConnectionFailed {
            endpoint: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl ReasoningClient for InferenceClient {
    async fn complete(&self, agent: &Agent, transcript: &Transcript) -> Result<String, InferenceError> {
        let (url, body, api_key) = self.build_request(agent, transcript)?;

        // Log the request metadata (not the full body; it can be huge)
        tracing::info!(
            url = %url,
            model = %body.model,
            agent = %agent.id,
            message_count = body.messages.len(),
            temperature = body.temperature,
            max_tokens = body.max_tokens,
            "reasoning request"
        );

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_send_error(e, &url, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| map_send_error(e, &url, self.request_timeout))?;

        parse_completion_text(&body_text)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
