//! Assemble a runnable system from an [`AppConfig`]: provider, guardrails,
//! per-agent tool registries, and the wired agent graph.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use baton_config::{AgentConfig, AppConfig, ProviderConfig};
use baton_core::agent::{AgentDefinition, ModelSettings};
use baton_core::provider::ModelProvider;
use baton_core::tool::ToolRegistry;
use baton_guardrails::GuardrailEngine;
use baton_providers::OpenAiCompatProvider;
use baton_runner::{RunConfig, Runner};
use baton_telemetry::InMemoryTraceSink;

/// Everything `run` needs, built once per invocation.
pub struct AssembledRuntime {
    pub runner: Runner,
    pub agents: HashMap<String, Arc<AgentDefinition>>,
    pub entry: Arc<AgentDefinition>,
    pub traces: Arc<InMemoryTraceSink>,
}

impl std::fmt::Debug for AssembledRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledRuntime")
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("entry", &self.entry.name())
            .finish_non_exhaustive()
    }
}

pub fn assemble(config: &AppConfig) -> anyhow::Result<AssembledRuntime> {
    let provider = build_provider(config)?;
    let guardrails = GuardrailEngine::from_specs(&config.guardrails)
        .map_err(|e| anyhow!("failed to build guardrails: {e}"))?;

    let default_model = config
        .default_provider_config()
        .and_then(|p| p.default_model.clone());

    // First pass: build every agent.
    let mut agents: HashMap<String, Arc<AgentDefinition>> = HashMap::new();
    for agent_config in &config.agents {
        let agent = build_agent(agent_config, default_model.as_deref())
            .with_context(|| format!("failed to build agent '{}'", agent_config.name))?;
        agents.insert(agent_config.name.clone(), agent);
    }

    // Second pass: wire hand-offs (the graph may contain cycles).
    for agent_config in &config.agents {
        let agent = &agents[&agent_config.name];
        for target in &agent_config.handoffs {
            let target_agent = agents
                .get(target)
                .ok_or_else(|| anyhow!("hand-off target '{target}' not found"))?;
            agent.add_handoff(target_agent);
        }
    }

    let entry_name = config.entry_agent()?.name.clone();
    let entry = Arc::clone(&agents[&entry_name]);

    let traces = Arc::new(InMemoryTraceSink::new());
    let run_config = RunConfig {
        max_turns: config.runner.max_turns,
        max_tool_concurrency: config.runner.max_tool_concurrency,
        fail_on_unknown_tool: config.runner.fail_on_unknown_tool,
        guardrails_every_turn: config.runner.guardrails_every_turn,
    };
    let runner = Runner::new(provider)
        .with_config(run_config)
        .with_guardrails(guardrails)
        .with_trace_sink(traces.clone());

    Ok(AssembledRuntime {
        runner,
        agents,
        entry,
        traces,
    })
}

fn build_agent(
    config: &AgentConfig,
    default_model: Option<&str>,
) -> anyhow::Result<Arc<AgentDefinition>> {
    let mut registry = ToolRegistry::new();
    for name in &config.tools {
        let tool = baton_tools::builtin_tool(name)
            .ok_or_else(|| anyhow!("unknown tool '{name}'"))?;
        registry.register(tool);
    }

    let mut settings = ModelSettings::default();
    if let Some(model) = config.model.as_deref().or(default_model) {
        settings.model = model.to_string();
    }
    if let Some(temperature) = config.temperature {
        settings.temperature = temperature;
    }
    settings.max_tokens = config.max_tokens;

    let mut builder = AgentDefinition::builder(&config.name)
        .description(&config.description)
        .instructions(&config.instructions)
        .tools(Arc::new(registry))
        .model_settings(settings);

    if let Some(schema) = &config.output_schema {
        builder = builder.output_schema(schema.clone());
    }

    builder.build().map_err(|e| anyhow!("{e}"))
}

fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name).cloned().unwrap_or_default();
    let api_key = config.resolve_api_key(name);

    let provider = match name {
        "openrouter" => OpenAiCompatProvider::openrouter(require_key(name, api_key)?),
        "openai" => OpenAiCompatProvider::openai(require_key(name, api_key)?),
        "ollama" => OpenAiCompatProvider::ollama(provider_config.api_url.as_deref()),
        other => {
            let ProviderConfig { api_url: Some(url), .. } = &provider_config else {
                bail!("provider '{other}' needs an api_url in its config");
            };
            OpenAiCompatProvider::new(other, url.as_str(), require_key(other, api_key)?)
        }
    };

    Ok(Arc::new(provider))
}

fn require_key(provider: &str, api_key: Option<String>) -> anyhow::Result<String> {
    api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
        anyhow!(
            "no API key for provider '{provider}': set BATON_API_KEY or \
             BATON_{}_API_KEY, or put api_key in the config",
            provider.to_uppercase().replace('-', "_")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_provider = "openrouter"
entry_agent = "triage"

[providers.openrouter]
api_key = "sk-test"
default_model = "anthropic/claude-sonnet-4"

[[agents]]
name = "triage"
description = "Routes requests"
instructions = "Route the user."
handoffs = ["billing", "support"]

[[agents]]
name = "billing"
description = "Handles invoices"
tools = ["calculator"]
handoffs = ["triage"]

[[agents]]
name = "support"
description = "Answers questions"
tools = ["current_time", "http_request"]

[[guardrails]]
name = "no-secrets"
kind = "input"
rule = "keyword_blocklist"
keywords = ["password"]
"#;

    #[test]
    fn assembles_wired_agent_graph() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let runtime = assemble(&config).unwrap();

        assert_eq!(runtime.agents.len(), 3);
        assert_eq!(runtime.entry.name(), "triage");

        // Hand-offs, including the triage <-> billing cycle, resolve.
        let triage = &runtime.agents["triage"];
        assert!(triage.handoff_target("billing").is_some());
        assert!(triage.handoff_target("support").is_some());
        let billing = &runtime.agents["billing"];
        assert_eq!(billing.handoff_target("triage").unwrap().name(), "triage");

        // Per-agent tool registries hold only the configured tools.
        assert!(triage.tools().is_empty());
        assert_eq!(billing.tools().names(), vec!["calculator"]);
        assert_eq!(
            runtime.agents["support"].tools().names(),
            vec!["current_time", "http_request"]
        );

        // Agents inherit the provider's default model.
        assert_eq!(billing.model_settings().model, "anthropic/claude-sonnet-4");
    }

    #[test]
    fn unknown_tool_fails_assembly() {
        let raw = r#"
[providers.openrouter]
api_key = "sk-test"

[[agents]]
name = "solo"
tools = ["teleporter"]
"#;
        let config = AppConfig::from_toml(raw).unwrap();
        let err = assemble(&config).unwrap_err();
        assert!(err.to_string().contains("solo"));
    }

    #[test]
    fn custom_provider_requires_api_url() {
        let raw = r#"
default_provider = "my-proxy"

[providers.my-proxy]
api_key = "sk-test"

[[agents]]
name = "solo"
"#;
        let config = AppConfig::from_toml(raw).unwrap();
        let err = assemble(&config).unwrap_err();
        assert!(err.to_string().contains("api_url"));
    }
}
