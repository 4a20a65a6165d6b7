//! Shared test helpers: scripted providers and simple tools.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use baton_core::error::{ProviderError, ToolError};
use baton_core::provider::{ModelProvider, ModelRequest, ModelResponse, ResponseItem, Usage};
use baton_core::tool::{Tool, ToolCall, ToolOutput, ToolRegistry};
use baton_core::RunContext;
use serde_json::json;

/// A provider that returns a scripted sequence of responses.
///
/// Every request is captured for later inspection. Panics when more calls
/// are made than responses provided, unless built with `repeating`.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ModelResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
    repeat_last: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            repeat_last: false,
        }
    }

    /// A provider that returns the same response on every call.
    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            responses: Mutex::new(vec![response]),
            requests: Mutex::new(Vec::new()),
            repeat_last: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// All requests seen so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        let index = if self.repeat_last {
            requests.len().min(responses.len() - 1)
        } else {
            requests.len()
        };
        let response = responses
            .get(index)
            .unwrap_or_else(|| {
                panic!(
                    "ScriptedProvider exhausted after {} calls ({} scripted)",
                    requests.len(),
                    responses.len()
                )
            })
            .clone();
        requests.push(request);
        Ok(response)
    }
}

/// A provider that streams its text in fixed-size chunks before completing.
pub struct ChunkingProvider {
    pub text: String,
    pub chunk_size: usize,
}

#[async_trait]
impl ModelProvider for ChunkingProvider {
    fn name(&self) -> &str {
        "chunking"
    }

    async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        Ok(text_response(&self.text))
    }

    async fn stream(
        &self,
        _request: ModelRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<baton_core::StreamDelta, ProviderError>>,
        ProviderError,
    > {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let text = self.text.clone();
        let chunk_size = self.chunk_size.max(1);
        tokio::spawn(async move {
            let chars: Vec<char> = text.chars().collect();
            for chunk in chars.chunks(chunk_size) {
                let delta: String = chunk.iter().collect();
                if tx
                    .send(Ok(baton_core::StreamDelta::Text { delta }))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            let _ = tx
                .send(Ok(baton_core::StreamDelta::Completed {
                    response: text_response(&text),
                }))
                .await;
        });
        Ok(rx)
    }
}

pub fn test_usage() -> Usage {
    Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    }
}

/// A plain text response.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        items: vec![ResponseItem::Text { content: text.into() }],
        usage: Some(test_usage()),
        model: "mock-model".into(),
    }
}

/// A response requesting the given tool calls (optionally with text).
pub fn tool_call_response(text: &str, calls: Vec<ToolCall>) -> ModelResponse {
    let mut items = Vec::new();
    if !text.is_empty() {
        items.push(ResponseItem::Text { content: text.into() });
    }
    items.extend(calls.into_iter().map(ResponseItem::ToolCall));
    ModelResponse {
        items,
        usage: Some(test_usage()),
        model: "mock-model".into(),
    }
}

/// A response requesting a hand-off, optionally alongside tool calls.
pub fn handoff_response(target: &str, calls: Vec<ToolCall>) -> ModelResponse {
    let mut items: Vec<ResponseItem> = calls.into_iter().map(ResponseItem::ToolCall).collect();
    items.push(ResponseItem::Handoff { target: target.into() });
    ModelResponse {
        items,
        usage: Some(test_usage()),
        model: "mock-model".into(),
    }
}

pub fn make_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments,
    }
}

/// A tool that sleeps, then reports its name.
pub struct SleepTool {
    pub name: String,
    pub delay_ms: u64,
}

#[async_trait]
impl Tool for SleepTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Sleeps for a configured delay, then answers"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(ToolOutput::text(format!("{} finished", self.name)))
    }
}

/// Build a registry from the given tools.
pub fn registry_of(tools: Vec<Arc<dyn Tool>>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    Arc::new(registry)
}
