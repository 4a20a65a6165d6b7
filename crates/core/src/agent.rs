//! Agent definitions.
//!
//! An [`AgentDefinition`] is an immutable description of one agent variant:
//! instructions, tools, permitted hand-off targets, and an optional
//! structured-output contract. Hand-off targets are held as weak references
//! — the loop does not own agent lifetime, and mutually-referencing agent
//! graphs must not leak — so wiring happens after construction via
//! [`AgentDefinition::add_handoff`].

use std::sync::{Arc, RwLock, Weak};

use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::Error;
use crate::schema::CompiledSchema;
use crate::tool::ToolRegistry;

/// The system directive for an agent: a fixed string or a function computed
/// per turn from the run context.
#[derive(Clone)]
pub enum Instructions {
    Static(String),
    Dynamic(Arc<dyn Fn(&RunContext) -> String + Send + Sync>),
}

impl Instructions {
    /// Resolve the directive for the current turn.
    pub fn resolve(&self, ctx: &RunContext) -> String {
        match self {
            Instructions::Static(s) => s.clone(),
            Instructions::Dynamic(f) => f(ctx),
        }
    }
}

impl std::fmt::Debug for Instructions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instructions::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Instructions::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Instructions {
    fn from(s: &str) -> Self {
        Instructions::Static(s.to_string())
    }
}

impl From<String> for Instructions {
    fn from(s: String) -> Self {
        Instructions::Static(s)
    }
}

/// Sampling settings applied to every model call made on behalf of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model identifier passed to the provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// Advertisement of a hand-off target in a model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffSpec {
    pub name: String,
    pub description: String,
}

/// The value that satisfies an agent's output contract and ends the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalOutput {
    /// Plain assistant text (agents without an output schema).
    Text(String),
    /// A JSON payload validated against the agent's output schema.
    Structured(serde_json::Value),
}

impl FinalOutput {
    /// The text form, if this is a plain-text output.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FinalOutput::Text(s) => Some(s),
            FinalOutput::Structured(_) => None,
        }
    }

    /// Render as a display string (structured outputs as compact JSON).
    pub fn render(&self) -> String {
        match self {
            FinalOutput::Text(s) => s.clone(),
            FinalOutput::Structured(v) => v.to_string(),
        }
    }

    /// The structured payload, if any.
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            FinalOutput::Text(_) => None,
            FinalOutput::Structured(v) => Some(v),
        }
    }
}

struct HandoffTarget {
    name: String,
    description: String,
    target: Weak<AgentDefinition>,
}

/// Immutable description of one agent variant.
///
/// Constructed through [`AgentDefinition::builder`]. Everything except the
/// hand-off wiring is fixed at build time; hand-offs may be added afterwards
/// so that cyclic graphs (A hands off to B, B back to A) are expressible.
pub struct AgentDefinition {
    name: String,
    description: String,
    instructions: Instructions,
    tools: Arc<ToolRegistry>,
    handoffs: RwLock<Vec<HandoffTarget>>,
    output_schema: Option<CompiledSchema>,
    model_settings: ModelSettings,
}

impl AgentDefinition {
    /// Start building an agent definition.
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    /// Unique name within a run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description shown to other agents when this agent is a hand-off target.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Resolve the system directive for the current turn.
    pub fn resolve_instructions(&self, ctx: &RunContext) -> String {
        self.instructions.resolve(ctx)
    }

    /// This agent's tool registry.
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// The output contract, if any. Absence means the final output is plain
    /// text.
    pub fn output_schema(&self) -> Option<&CompiledSchema> {
        self.output_schema.as_ref()
    }

    pub fn model_settings(&self) -> &ModelSettings {
        &self.model_settings
    }

    /// Permit a hand-off from this agent to `target`.
    ///
    /// Stores a weak reference; the caller keeps ownership of the target.
    pub fn add_handoff(&self, target: &Arc<AgentDefinition>) {
        let mut handoffs = self.handoffs.write().unwrap();
        // Re-registering the same target replaces the previous entry.
        handoffs.retain(|h| h.name != target.name());
        handoffs.push(HandoffTarget {
            name: target.name().to_string(),
            description: target.description().to_string(),
            target: Arc::downgrade(target),
        });
    }

    /// Hand-off advertisements for a model request, in registration order.
    pub fn handoff_specs(&self) -> Vec<HandoffSpec> {
        self.handoffs
            .read()
            .unwrap()
            .iter()
            .map(|h| HandoffSpec {
                name: h.name.clone(),
                description: h.description.clone(),
            })
            .collect()
    }

    /// Whether `name` is a permitted hand-off target.
    pub fn has_handoff(&self, name: &str) -> bool {
        self.handoffs.read().unwrap().iter().any(|h| h.name == name)
    }

    /// Resolve a hand-off target by name, upgrading the weak reference.
    /// Returns `None` when the target is not in the hand-off set or has been
    /// dropped.
    pub fn handoff_target(&self, name: &str) -> Option<Arc<AgentDefinition>> {
        self.handoffs
            .read()
            .unwrap()
            .iter()
            .find(|h| h.name == name)
            .and_then(|h| h.target.upgrade())
    }
}

impl std::fmt::Debug for AgentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDefinition")
            .field("name", &self.name)
            .field("instructions", &self.instructions)
            .field("tools", &self.tools.names())
            .field(
                "handoffs",
                &self
                    .handoffs
                    .read()
                    .unwrap()
                    .iter()
                    .map(|h| h.name.clone())
                    .collect::<Vec<_>>(),
            )
            .field("output_schema", &self.output_schema.is_some())
            .field("model_settings", &self.model_settings)
            .finish()
    }
}

/// Builder for [`AgentDefinition`].
pub struct AgentBuilder {
    name: String,
    description: String,
    instructions: Instructions,
    tools: Arc<ToolRegistry>,
    output_schema: Option<serde_json::Value>,
    model_settings: ModelSettings,
    handoffs: Vec<Arc<AgentDefinition>>,
}

impl AgentBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: Instructions::Static(String::new()),
            tools: Arc::new(ToolRegistry::new()),
            output_schema: None,
            model_settings: ModelSettings::default(),
            handoffs: Vec::new(),
        }
    }

    /// Set the description used when this agent is advertised as a hand-off
    /// target.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set static instructions.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Instructions::Static(instructions.into());
        self
    }

    /// Set instructions computed per turn from the run context.
    pub fn dynamic_instructions<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext) -> String + Send + Sync + 'static,
    {
        self.instructions = Instructions::Dynamic(Arc::new(f));
        self
    }

    /// Attach a tool registry (shared between agents via `Arc`).
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Require the final output to validate against this JSON schema.
    pub fn output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model_settings.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.model_settings.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.model_settings.max_tokens = Some(max_tokens);
        self
    }

    pub fn model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Permit a hand-off to an already-built agent. For cyclic graphs, build
    /// both agents first and wire them with [`AgentDefinition::add_handoff`].
    pub fn handoff(mut self, target: &Arc<AgentDefinition>) -> Self {
        self.handoffs.push(Arc::clone(target));
        self
    }

    /// Build the definition.
    ///
    /// Fails when the name is empty or the output schema does not compile.
    pub fn build(self) -> Result<Arc<AgentDefinition>, Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Config {
                message: "agent name cannot be empty".into(),
            });
        }

        let output_schema = match self.output_schema {
            Some(raw) => Some(CompiledSchema::compile(raw)?),
            None => None,
        };

        let agent = Arc::new(AgentDefinition {
            name: self.name,
            description: self.description,
            instructions: self.instructions,
            tools: self.tools,
            handoffs: RwLock::new(Vec::new()),
            output_schema,
            model_settings: self.model_settings,
        });

        for target in &self.handoffs {
            agent.add_handoff(target);
        }

        Ok(agent)
    }
}
