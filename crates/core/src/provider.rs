//! Model provider trait — the abstraction over LLM backends.
//!
//! A provider accepts a request (active instructions, ordered history, tool
//! specs, optional output schema, sampling settings) and returns a response
//! parsed into a sequence of tagged content items: text segments, tool-call
//! requests, and hand-off markers. The orchestration loop matches on item
//! kind exhaustively; providers own all wire-format concerns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::HandoffSpec;
use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::ToolCall;

/// A request to the model provider for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "anthropic/claude-sonnet-4", "gpt-4o").
    pub model: String,

    /// The active agent's resolved instructions (system directive).
    pub instructions: String,

    /// Full conversation history, in order.
    pub history: Vec<Message>,

    /// Tools the model may call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Hand-off targets the model may transfer control to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handoffs: Vec<HandoffSpec>,

    /// Schema the final output must validate against, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// One parsed content item of a model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseItem {
    /// A text segment.
    Text { content: String },

    /// A requested tool invocation.
    ToolCall(ToolCall),

    /// A request to transfer control to another agent.
    Handoff { target: String },
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Ordered content items.
    pub items: Vec<ResponseItem>,

    /// Token usage statistics.
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested).
    pub model: String,
}

impl ModelResponse {
    /// All text segments joined in order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            if let ResponseItem::Text { content } = item {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(content);
            }
        }
        out
    }

    /// All requested tool calls, in order.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ResponseItem::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// The first hand-off target, if any.
    pub fn handoff_target(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            ResponseItem::Handoff { target } => Some(target.as_str()),
            _ => None,
        })
    }
}

/// Token usage information, accumulated across a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Fold another usage record into this one.
    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A single delta in a streaming response.
///
/// Providers emit zero or more `Text` deltas followed by exactly one
/// `Completed` carrying the fully aggregated response. Aggregation is the
/// provider's concern so the loop's control flow stays linear.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// Partial text content.
    Text { delta: String },

    /// The stream finished; the complete parsed response.
    Completed { response: ModelResponse },
}

/// The core provider trait.
///
/// Every LLM backend implements this trait. The loop calls `complete()` or
/// `stream()` without knowing which provider is in use. Transient failures
/// (timeouts, rate limits) are expected to be retried at this boundary, not
/// inside the orchestration loop.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelResponse, ProviderError>;

    /// Send a request and get a stream of deltas.
    ///
    /// Default implementation calls `complete()` and emits a single
    /// `Completed` delta.
    async fn stream(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamDelta, ProviderError>>,
        ProviderError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(StreamDelta::Completed { response })).await;
        Ok(rx)
    }
}
