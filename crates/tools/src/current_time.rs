//! Current time tool.

use async_trait::async_trait;
use baton_core::error::ToolError;
use baton_core::tool::{Tool, ToolOutput};
use baton_core::RunContext;
use chrono::Utc;

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC (RFC 3339)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &RunContext,
    ) -> Result<ToolOutput, ToolError> {
        let now = Utc::now();
        Ok(ToolOutput::text(now.to_rfc3339()).with_data(serde_json::json!({
            "unix_timestamp": now.timestamp(),
        })))
    }
}
