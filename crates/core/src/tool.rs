//! Tool trait — the abstraction over model-invocable capabilities.
//!
//! Tools are arbitrary side-effecting functions the model may request to
//! invoke. Purity is not assumed. Each agent carries its own registry;
//! registries are `Arc`-shared so several agents can expose the same tools.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::schema::CompiledSchema;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the provider's tool_call id).
    pub id: String,

    /// Name of the tool to execute.
    pub name: String,

    /// Arguments as a JSON value.
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool considers the invocation successful.
    pub success: bool,

    /// Output content fed back to the model.
    pub content: String,

    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolOutput {
    /// A successful plain-text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            data: None,
        }
    }

    /// A failed output whose content explains the failure to the model.
    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            success: false,
            content: content.into(),
            data: None,
        }
    }

    /// Attach a structured payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The core Tool trait.
///
/// Implementations are registered in a [`ToolRegistry`] and exposed to the
/// model through their [`ToolDefinition`]. Arguments are validated against
/// [`Tool::parameters_schema`] before `execute` is invoked.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool within a registry.
    fn name(&self) -> &str;

    /// Description sent to the model.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with already-validated arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &RunContext,
    ) -> std::result::Result<ToolOutput, ToolError>;

    /// Convert this tool into a definition for the model request.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

struct RegistryEntry {
    tool: Arc<dyn Tool>,
    /// Compiled parameter schema; `None` when the tool's schema failed to
    /// compile, in which case argument validation is skipped with a warning.
    schema: Option<CompiledSchema>,
}

/// A registry of available tools, owned by an agent definition.
pub struct ToolRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let schema = match CompiledSchema::compile(tool.parameters_schema()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool parameter schema failed to compile, skipping argument validation");
                None
            }
        };
        self.entries.insert(name, RegistryEntry { tool, schema });
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.entries.get(name).map(|e| &e.tool)
    }

    /// Validate arguments for a named tool against its compiled schema.
    pub fn validate_arguments(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> std::result::Result<(), ToolError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if let Some(schema) = &entry.schema {
            schema
                .validate(arguments)
                .map_err(|reason| ToolError::InvalidArguments {
                    tool_name: name.to_string(),
                    reason,
                })?;
        }
        Ok(())
    }

    /// Get all tool definitions for the model request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.entries.values().map(|e| e.tool.to_definition()).collect();
        // Deterministic request payloads regardless of map iteration order.
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
