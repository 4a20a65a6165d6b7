//! OpenAI-compatible provider.
//!
//! Speaks the `/v1/chat/completions` dialect, which covers OpenAI,
//! OpenRouter, Ollama, vLLM, Together, Fireworks, and most proxies.
//!
//! Wire mapping:
//! - the agent's instructions become the leading `system` message
//! - hand-off targets are advertised as function tools named
//!   `transfer_to_<agent>`; a tool call with such a name parses back into a
//!   hand-off item instead of a tool call
//! - a hand-off marker in history is replayed as the corresponding
//!   assistant tool call plus a synthetic acknowledging tool message, so
//!   the wire transcript stays well-formed for strict endpoints
//!
//! Supports non-streaming completion and SSE streaming with tool-call
//! delta accumulation.

use async_trait::async_trait;
use baton_core::error::ProviderError;
use baton_core::message::Message;
use baton_core::provider::{
    ModelProvider, ModelRequest, ModelResponse, ResponseItem, StreamDelta, Usage,
};
use baton_core::tool::ToolCall;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// An OpenAI-compatible model provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// OpenRouter convenience constructor.
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// OpenAI convenience constructor.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Ollama convenience constructor (no real key needed).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
        )
    }

    fn request_body(request: &ModelRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": to_api_messages(request),
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        let tools = to_api_tools(request);
        if !tools.is_empty() {
            body["tools"] = serde_json::json!(tools);
        }

        if let Some(schema) = &request.output_schema {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": "final_output", "schema": schema }
            });
        }

        body
    }

    async fn post(
        &self,
        body: &serde_json::Value,
        sse: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if sse {
            request = request.header("Accept", "text/event-stream");
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited { retry_after_secs: 5 }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(
                "invalid API key or insufficient permissions".into(),
            )),
            404 => Err(ProviderError::ModelNotFound(
                body["model"].as_str().unwrap_or("unknown").to_string(),
            )),
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(status, body = %error_body, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                })
            }
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let handoff_names: Vec<String> =
            request.handoffs.iter().map(|h| h.name.clone()).collect();
        let body = Self::request_body(&request, false);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post(&body, false).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON body: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| (tc.id, tc.function.name, tc.function.arguments))
            .collect();

        let items = parse_items(choice.message.content, tool_calls, &handoff_names);

        Ok(ModelResponse {
            items,
            usage: api_response.usage.map(Usage::from),
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ModelRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamDelta, ProviderError>>,
        ProviderError,
    > {
        let handoff_names: Vec<String> =
            request.handoffs.iter().map(|h| h.name.clone()).collect();
        let body = Self::request_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post(&body, true).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut aggregator = StreamAggregator::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete SSE lines; keep the trailing partial line.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end_matches('\r').to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        let response = aggregator.finish(&handoff_names);
                        let _ = tx.send(Ok(StreamDelta::Completed { response })).await;
                        return;
                    }

                    match serde_json::from_str::<ApiStreamChunk>(data) {
                        Ok(chunk) => {
                            if let Some(delta) = aggregator.apply(chunk) {
                                if tx.send(Ok(StreamDelta::Text { delta })).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            debug!(error = %e, "Skipping unparseable stream chunk");
                        }
                    }
                }
            }

            // Stream ended without [DONE]; emit what was accumulated.
            let response = aggregator.finish(&handoff_names);
            let _ = tx.send(Ok(StreamDelta::Completed { response })).await;
        });

        Ok(rx)
    }
}

/// Accumulates streamed deltas into a complete response.
#[derive(Default)]
struct StreamAggregator {
    content: String,
    /// Tool call fragments keyed by stream index.
    tool_calls: BTreeMap<u32, (String, String, String)>,
    usage: Option<Usage>,
    model: String,
}

impl StreamAggregator {
    /// Fold one chunk in; returns new text to forward, if any.
    fn apply(&mut self, chunk: ApiStreamChunk) -> Option<String> {
        if let Some(model) = chunk.model {
            self.model = model;
        }
        if let Some(usage) = chunk.usage {
            self.usage = Some(Usage::from(usage));
        }

        let choice = chunk.choices.into_iter().next()?;
        let mut emitted = None;

        if let Some(text) = choice.delta.content {
            if !text.is_empty() {
                self.content.push_str(&text);
                emitted = Some(text);
            }
        }

        for tc in choice.delta.tool_calls.unwrap_or_default() {
            let entry = self.tool_calls.entry(tc.index).or_default();
            if let Some(id) = tc.id {
                entry.0 = id;
            }
            if let Some(function) = tc.function {
                if let Some(name) = function.name {
                    entry.1 = name;
                }
                if let Some(arguments) = function.arguments {
                    entry.2.push_str(&arguments);
                }
            }
        }

        emitted
    }

    fn finish(self, handoff_names: &[String]) -> ModelResponse {
        let content = (!self.content.is_empty()).then_some(self.content);
        let tool_calls = self.tool_calls.into_values().collect();
        ModelResponse {
            items: parse_items(content, tool_calls, handoff_names),
            usage: self.usage,
            model: self.model,
        }
    }
}

/// Name prefix under which hand-off targets are advertised as tools.
const TRANSFER_PREFIX: &str = "transfer_to_";

/// Parse the wire-level content + tool calls into response items.
///
/// A tool call named `transfer_to_<x>` where `<x>` is an advertised
/// hand-off target becomes a hand-off item; everything else stays a tool
/// call (including transfers to unknown targets, which the loop will then
/// reject or report).
fn parse_items(
    content: Option<String>,
    tool_calls: Vec<(String, String, String)>,
    handoff_names: &[String],
) -> Vec<ResponseItem> {
    let mut items = Vec::new();

    if let Some(content) = content {
        if !content.is_empty() {
            items.push(ResponseItem::Text { content });
        }
    }

    for (id, name, raw_arguments) in tool_calls {
        if let Some(target) = name.strip_prefix(TRANSFER_PREFIX) {
            if handoff_names.iter().any(|h| h.as_str() == target) {
                items.push(ResponseItem::Handoff { target: target.to_string() });
                continue;
            }
        }

        let arguments = serde_json::from_str(&raw_arguments)
            .unwrap_or(serde_json::Value::String(raw_arguments));
        items.push(ResponseItem::ToolCall(ToolCall { id, name, arguments }));
    }

    items
}

/// Render the request's instructions and history as wire messages.
fn to_api_messages(request: &ModelRequest) -> Vec<ApiMessage> {
    let mut out = Vec::with_capacity(request.history.len() + 1);

    if !request.instructions.is_empty() {
        out.push(ApiMessage {
            role: "system".into(),
            content: Some(request.instructions.clone()),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for message in &request.history {
        match message {
            Message::User { content, .. } => out.push(ApiMessage {
                role: "user".into(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            }),

            Message::Assistant { content, tool_calls, .. } => out.push(ApiMessage {
                role: "assistant".into(),
                content: Some(content.clone()),
                tool_calls: (!tool_calls.is_empty()).then(|| {
                    tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: None,
            }),

            Message::ToolResult { call_id, content, .. } => out.push(ApiMessage {
                role: "tool".into(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(call_id.clone()),
            }),

            // Replay the transfer as the tool-call pair the model originally
            // produced, so strict endpoints accept the transcript.
            Message::Handoff { id, to, .. } => {
                out.push(ApiMessage {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(vec![ApiToolCall {
                        id: id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: format!("{TRANSFER_PREFIX}{to}"),
                            arguments: "{}".into(),
                        },
                    }]),
                    tool_call_id: None,
                });
                out.push(ApiMessage {
                    role: "tool".into(),
                    content: Some(
                        serde_json::json!({ "assistant": to }).to_string(),
                    ),
                    tool_calls: None,
                    tool_call_id: Some(id.clone()),
                });
            }
        }
    }

    out
}

/// Render tool definitions plus hand-off transfer tools.
fn to_api_tools(request: &ModelRequest) -> Vec<ApiToolDefinition> {
    request
        .tools
        .iter()
        .map(|t| ApiToolDefinition {
            r#type: "function".into(),
            function: ApiToolFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .chain(request.handoffs.iter().map(|h| ApiToolDefinition {
            r#type: "function".into(),
            function: ApiToolFunction {
                name: format!("{TRANSFER_PREFIX}{}", h.name),
                description: if h.description.is_empty() {
                    format!("Transfer the conversation to the '{}' agent.", h.name)
                } else {
                    format!(
                        "Transfer the conversation to the '{}' agent. {}",
                        h.name, h.description
                    )
                },
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {},
                    "additionalProperties": false
                }),
            },
        }))
        .collect()
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    #[serde(default)]
    choices: Vec<ApiStreamChoice>,
    usage: Option<ApiUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    delta: ApiDelta,
}

#[derive(Debug, Deserialize)]
struct ApiDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCallDelta {
    index: u32,
    id: Option<String>,
    function: Option<ApiFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}
