//! Configuration loading and validation.
//!
//! Reads `config.yaml` and resolves environment variables. The file is the
//! single source of truth for model endpoints and the engine's round budget,
//! turn timeout, selection policy, termination markers and default roster.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::errors::InferenceError;
use crate::agent_core::types::{AgentRole, SelectionPolicy};

/// Name of the config file searched for on disk.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Env var that points directly at a config file.
pub const CONFIG_ENV_VAR: &str = "VIGNETTE_FORGE_CONFIG";

// ─── Public Types ────────────────────────────────────────────────────────────

/// A single model's runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub display_name: String,
    pub base_url: String,
    /// Model identifier sent on the wire. Defaults to the config key.
    #[serde(default)]
    pub model_name: Option<String>,
    /// Bearer token. Usually `${OPENAI_API_KEY}`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    1.0
}
fn default_max_tokens() -> u32 {
    2048
}

/// Markers the termination evaluator looks for in a Presenter message.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminationConfig {
    #[serde(default = "default_question_markers")]
    pub question_markers: Vec<String>,
    #[serde(default = "default_answer_markers")]
    pub answer_markers: Vec<String>,
}

fn default_question_markers() -> Vec<String> {
    vec!["question".to_string()]
}
fn default_answer_markers() -> Vec<String> {
    vec![
        "correct_answer".to_string(),
        "correct answer".to_string(),
        "answer:".to_string(),
    ]
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            question_markers: default_question_markers(),
            answer_markers: default_answer_markers(),
        }
    }
}

/// One roster slot declared in config.
///
/// Only `role` is required; the id and prompt fall back to the built-in
/// contract for that role.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub role: AgentRole,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// Pin this agent to a model key from `models`.
    #[serde(default)]
    pub model: Option<String>,
}

/// Conversation engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Default round budget when a request does not set one.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Per-turn ceiling on a single reasoning call.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    #[serde(default)]
    pub selection_policy: SelectionPolicy,
    #[serde(default)]
    pub termination: TerminationConfig,
    /// Default roster. When absent the built-in vignette workflow is used.
    #[serde(default)]
    pub roster: Option<Vec<RosterEntry>>,
}

fn default_max_rounds() -> u32 {
    15
}
fn default_turn_timeout_secs() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            turn_timeout_secs: default_turn_timeout_secs(),
            selection_policy: SelectionPolicy::default(),
            termination: TerminationConfig::default(),
            roster: None,
        }
    }
}

impl EngineConfig {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }
}

/// Top-level configuration (mirrors `config.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct ForgeConfig {
    pub active_model: String,
    pub models: HashMap<String, ModelConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ForgeConfig {
    /// Check cross-references that serde cannot: the active model and every
    /// pinned roster model must exist.
    pub fn validate(&self) -> Result<(), InferenceError> {
        resolve_active_model(self)?;

        if let Some(entries) = &self.engine.roster {
            for entry in entries {
                if let Some(key) = &entry.model {
                    if !self.models.contains_key(key) {
                        return Err(InferenceError::ConfigError {
                            reason: format!(
                                "roster entry {:?} pins unknown model '{key}'",
                                entry.role
                            ),
                        });
                    }
                }
            }
        }

        if self.engine.turn_timeout_secs == 0 {
            return Err(InferenceError::ConfigError {
                reason: "engine.turn_timeout_secs must be positive".into(),
            });
        }

        Ok(())
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Checks `VIGNETTE_FORGE_CONFIG` first, then searches upward from `start`
/// for `config.yaml`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, InferenceError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(expand_tilde(&path));
        if candidate.exists() {
            return Ok(candidate);
        }
        return Err(InferenceError::ConfigError {
            reason: format!("{CONFIG_ENV_VAR} points at missing file {}", candidate.display()),
        });
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(InferenceError::ConfigError {
        reason: format!("could not find {CONFIG_FILE_NAME}"),
    })
}

/// Load, interpolate, parse and validate the configuration file.
///
/// Performs environment-variable interpolation on string values matching
/// `${VAR_NAME}` or `${VAR_NAME:-default}`.
pub fn load_config(path: &Path) -> Result<ForgeConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    parse_config(&raw)
}

/// Parse configuration from YAML text.
pub fn parse_config(raw: &str) -> Result<ForgeConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw);

    let config: ForgeConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
            reason: format!("failed to parse config: {e}"),
        })?;

    config.validate()?;
    Ok(config)
}

/// Resolve the active model configuration.
pub fn resolve_active_model(config: &ForgeConfig) -> Result<(String, ModelConfig), InferenceError> {
    config
        .models
        .get(&config.active_model)
        .map(|model| (config.active_model.clone(), model.clone()))
        .ok_or_else(|| InferenceError::ConfigError {
            reason: format!("active model '{}' not found in config", config.active_model),
        })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        active_model: gpt-4
        models:
          gpt-4:
            display_name: "GPT-4"
            base_url: "http://localhost:11434/v1"
    "#;

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__VF_TEST_NONEXISTENT_VAR__");
        let result = interpolate_env_vars("${__VF_TEST_NONEXISTENT_VAR__:-/fallback/path}");
        assert_eq!(result, "/fallback/path");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__VF_TEST_API_KEY__", "sk-test");
        let result = interpolate_env_vars("api_key: ${__VF_TEST_API_KEY__}");
        assert_eq!(result, "api_key: sk-test");
        std::env::remove_var("__VF_TEST_API_KEY__");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "plain text with no variables";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/vignettes");
        assert!(!result.starts_with('~'), "tilde should be expanded");
        assert!(result.ends_with("/vignettes"));
    }

    #[test]
    fn test_minimal_config_uses_engine_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.engine.max_rounds, 15);
        assert_eq!(config.engine.turn_timeout(), Duration::from_secs(120));
        assert_eq!(config.engine.selection_policy, SelectionPolicy::Adaptive);
        assert!(config.engine.roster.is_none());
        assert_eq!(config.engine.termination.question_markers, vec!["question"]);

        let model = &config.models["gpt-4"];
        assert_eq!(model.temperature, 1.0);
        assert!(model.api_key.is_none());
    }

    #[test]
    fn test_engine_section_parsed() {
        let yaml = r#"
            active_model: gpt-4
            models:
              gpt-4:
                display_name: "GPT-4"
                base_url: "https://api.openai.com/v1"
              labeler:
                display_name: "Labeler"
                base_url: "https://api.openai.com/v1"
                temperature: 0.0
            engine:
              max_rounds: 6
              turn_timeout_secs: 30
              selection_policy: round_robin
              termination:
                answer_markers: ["ANSWER"]
              roster:
                - role: generator
                - role: labeler
                  model: labeler
                - role: presenter
                  id: Show-Vignette
        "#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.engine.max_rounds, 6);
        assert_eq!(config.engine.selection_policy, SelectionPolicy::RoundRobin);
        assert_eq!(config.engine.termination.answer_markers, vec!["ANSWER"]);
        // Unset marker list keeps its default
        assert_eq!(config.engine.termination.question_markers, vec!["question"]);

        let roster = config.engine.roster.unwrap();
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[1].role, AgentRole::Labeler);
        assert_eq!(roster[1].model.as_deref(), Some("labeler"));
        assert_eq!(roster[2].id.as_deref(), Some("Show-Vignette"));
    }

    #[test]
    fn test_active_model_not_found() {
        let yaml = r#"
            active_model: nonexistent
            models: {}
        "#;
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_pinned_unknown_model_rejected() {
        let yaml = format!(
            "{MINIMAL}\n        engine:\n          roster:\n            - role: labeler\n              model: missing\n"
        );
        let err = parse_config(&yaml).unwrap_err();
        assert!(err.to_string().contains("missing"), "got: {err}");
    }

    #[test]
    fn test_zero_turn_timeout_rejected() {
        let yaml = format!("{MINIMAL}\n        engine:\n          turn_timeout_secs: 0\n");
        assert!(parse_config(&yaml).is_err());
    }

    #[test]
    fn test_load_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, MINIMAL).unwrap();

        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        // Only walk upward when the env override is unset.
        if std::env::var(CONFIG_ENV_VAR).is_err() {
            let found = find_config_path(&nested).unwrap();
            assert_eq!(found, path);
        }

        let config = load_config(&path).unwrap();
        assert_eq!(config.active_model, "gpt-4");
    }
}
