//! HTTP request tool — fetches a URL on the agent's behalf.
//!
//! GET and POST only, http(s) schemes only, response bodies truncated at a
//! fixed cap so a large page cannot blow up the conversation history.

use async_trait::async_trait;
use baton_core::error::ToolError;
use baton_core::tool::{Tool, ToolOutput};
use baton_core::RunContext;
use tracing::debug;

/// Response bodies beyond this many bytes are truncated.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub struct HttpRequestTool {
    client: reqwest::Client,
}

impl HttpRequestTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpRequestTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request. Supports GET and POST. Returns the status code \
         and the (possibly truncated) response body."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to request (http or https)"
                },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST"],
                    "description": "HTTP method, defaults to GET"
                },
                "body": {
                    "type": "string",
                    "description": "Request body for POST"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let url = arguments["url"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments {
                tool_name: "http_request".into(),
                reason: "missing 'url' argument".into(),
            }
        })?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments {
                tool_name: "http_request".into(),
                reason: "URL must use http or https".into(),
            });
        }

        let method = arguments["method"].as_str().unwrap_or("GET").to_uppercase();
        debug!(%url, %method, "http_request tool dispatching");

        let request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => {
                let body = arguments["body"].as_str().unwrap_or("").to_string();
                self.client.post(url).body(body)
            }
            other => {
                return Err(ToolError::InvalidArguments {
                    tool_name: "http_request".into(),
                    reason: format!("unsupported method '{other}', use GET or POST"),
                });
            }
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Ok(ToolOutput::failure(format!("Request failed: {e}"))),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(ToolOutput::failure(format!("Failed to read body: {e}"))),
        };

        let truncated = body.len() > MAX_BODY_BYTES;
        let body = if truncated {
            let mut end = MAX_BODY_BYTES;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}\n[truncated at {MAX_BODY_BYTES} bytes]", &body[..end])
        } else {
            body
        };

        let output = ToolOutput {
            success: status < 400,
            content: format!("HTTP {status}\n{body}"),
            data: Some(serde_json::json!({
                "status": status,
                "truncated": truncated,
            })),
        };
        Ok(output)
    }
}
