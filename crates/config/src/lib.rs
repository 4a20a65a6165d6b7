//! Configuration loading, validation, and management for baton.
//!
//! Loads a TOML config describing the runner settings, model providers,
//! the agent graph, and guardrails. API keys come from the environment
//! (`BATON_API_KEY`, or `BATON_<PROVIDER>_API_KEY` per provider) with the
//! config file as fallback. The agent graph is validated at load time so a
//! dangling hand-off target fails fast rather than mid-run.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use baton_guardrails::GuardrailSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Orchestration loop settings.
    #[serde(default)]
    pub runner: RunnerSettings,

    /// Which provider entry to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Provider endpoints and credentials, keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// The agent graph.
    #[serde(default)]
    pub agents: Vec<AgentConfig>,

    /// The agent a run starts with; defaults to the first declared agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_agent: Option<String>,

    /// Guardrails, evaluated in declaration order.
    #[serde(default)]
    pub guardrails: Vec<GuardrailSpec>,
}

fn default_provider() -> String {
    "openrouter".into()
}

/// Settings for the orchestration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Maximum model calls per run.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Bound on concurrently executing tool calls within a turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_concurrency: Option<usize>,

    /// Fail the run when the model names a tool the agent doesn't have.
    #[serde(default)]
    pub fail_on_unknown_tool: bool,

    /// Re-run input guardrails before every model call.
    #[serde(default)]
    pub guardrails_every_turn: bool,
}

fn default_max_turns() -> u32 {
    10
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_tool_concurrency: None,
            fail_on_unknown_tool: false,
            guardrails_every_turn: false,
        }
    }
}

/// One provider endpoint.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible endpoint. Defaults per provider
    /// name when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key. Prefer the environment over the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used when an agent doesn't name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// One agent in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent name.
    pub name: String,

    /// Description shown to agents that can hand off here.
    #[serde(default)]
    pub description: String,

    /// System directive.
    #[serde(default)]
    pub instructions: String,

    /// Names of built-in tools this agent may call.
    #[serde(default)]
    pub tools: Vec<String>,

    /// Names of agents this agent may hand off to.
    #[serde(default)]
    pub handoffs: Vec<String>,

    /// JSON Schema the final output must validate against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,

    /// Model override for this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("runner", &self.runner)
            .field("default_provider", &self.default_provider)
            .field("providers", &self.providers)
            .field("agents", &self.agents)
            .field("entry_agent", &self.entry_agent)
            .field("guardrails", &self.guardrails)
            .finish()
    }
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the agent graph and references.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(ConfigError::invalid("agent name cannot be empty"));
            }
            if !names.insert(agent.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
        }

        for agent in &self.agents {
            for target in &agent.handoffs {
                if !names.contains(target.as_str()) {
                    return Err(ConfigError::invalid(format!(
                        "agent '{}' hands off to unknown agent '{}'",
                        agent.name, target
                    )));
                }
                if target == &agent.name {
                    return Err(ConfigError::invalid(format!(
                        "agent '{}' cannot hand off to itself",
                        agent.name
                    )));
                }
            }
        }

        if let Some(entry) = &self.entry_agent {
            if !names.contains(entry.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "entry agent '{entry}' is not declared"
                )));
            }
        }

        Ok(())
    }

    /// The agent runs start with.
    pub fn entry_agent(&self) -> Result<&AgentConfig, ConfigError> {
        match &self.entry_agent {
            Some(name) => self
                .agents
                .iter()
                .find(|a| &a.name == name)
                .ok_or_else(|| ConfigError::invalid(format!("entry agent '{name}' is not declared"))),
            None => self
                .agents
                .first()
                .ok_or_else(|| ConfigError::invalid("no agents declared")),
        }
    }

    /// Look up an agent by name.
    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// The configured default provider entry, if declared.
    pub fn default_provider_config(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.default_provider)
    }

    /// Resolve the API key for a provider: `BATON_<PROVIDER>_API_KEY`,
    /// then `BATON_API_KEY`, then the config file value.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        let scoped = format!(
            "BATON_{}_API_KEY",
            provider.to_uppercase().replace('-', "_")
        );
        if let Ok(key) = std::env::var(&scoped) {
            if !key.is_empty() {
                return Some(key);
            }
        }
        if let Ok(key) = std::env::var("BATON_API_KEY") {
            if !key.is_empty() {
                return Some(key);
            }
        }
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
    }
}
