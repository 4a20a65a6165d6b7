//! Concurrent tool execution.
//!
//! All tool calls from one model response fire in parallel and join before
//! the loop proceeds; results are collected in the order the model
//! requested the calls, regardless of completion order, so history stays
//! deterministic. A failing call becomes an error result fed back to the
//! model rather than aborting the run — unless the tool marked the error
//! fatal, or an unknown tool name is configured to be fatal.

use std::time::Instant;

use baton_core::agent::AgentDefinition;
use baton_core::error::{Error, ToolError};
use baton_core::message::Message;
use baton_core::tool::ToolCall;
use baton_core::trace::{TraceEvent, TraceSink};
use baton_core::RunContext;
use chrono::Utc;
use tracing::{debug, warn};

/// One resolved tool call, in request order.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub call: ToolCall,
    pub content: String,
    pub success: bool,
    pub duration_ms: u64,
}

impl ExecutedCall {
    /// The history item recording this call's result.
    pub fn to_message(&self) -> Message {
        if self.success {
            Message::tool_result(&self.call.id, &self.call.name, &self.content)
        } else {
            Message::tool_error(&self.call.id, &self.call.name, &self.content)
        }
    }
}

/// Executes batches of tool calls against the active agent's registry.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutor {
    /// Upper bound on concurrently running calls. `None` runs the whole
    /// batch at once.
    max_concurrency: Option<usize>,

    /// Treat an unknown tool name as fatal to the run instead of feeding an
    /// error result back to the model.
    fail_on_unknown_tool: bool,
}

impl ToolExecutor {
    pub fn new(max_concurrency: Option<usize>, fail_on_unknown_tool: bool) -> Self {
        Self {
            max_concurrency,
            fail_on_unknown_tool,
        }
    }

    /// Execute all calls from one response.
    ///
    /// Calls run concurrently in chunks of at most `max_concurrency`; the
    /// returned vector preserves request order. The first fatal error
    /// aborts the batch after its chunk has joined (in-flight calls finish).
    pub async fn execute_batch(
        &self,
        agent: &AgentDefinition,
        calls: &[ToolCall],
        ctx: &RunContext,
        sink: &dyn TraceSink,
    ) -> Result<Vec<ExecutedCall>, Error> {
        let concurrency = self.max_concurrency.unwrap_or(calls.len()).max(1);
        let mut executed = Vec::with_capacity(calls.len());

        for chunk in calls.chunks(concurrency) {
            let futs: Vec<_> = chunk
                .iter()
                .map(|call| self.execute_single(agent, call, ctx, sink))
                .collect();
            for result in futures::future::join_all(futs).await {
                executed.push(result?);
            }
        }

        Ok(executed)
    }

    async fn execute_single(
        &self,
        agent: &AgentDefinition,
        call: &ToolCall,
        ctx: &RunContext,
        sink: &dyn TraceSink,
    ) -> Result<ExecutedCall, Error> {
        sink.record(&TraceEvent::ToolCallStarted {
            run_id: ctx.run_id,
            call_id: call.id.clone(),
            tool: call.name.clone(),
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let outcome = self.resolve_and_run(agent, call, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (content, success) = match outcome {
            Ok((content, success)) => (content, success),
            Err(fatal) => {
                sink.record(&TraceEvent::ToolCallFinished {
                    run_id: ctx.run_id,
                    call_id: call.id.clone(),
                    tool: call.name.clone(),
                    success: false,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                return Err(fatal);
            }
        };

        sink.record(&TraceEvent::ToolCallFinished {
            run_id: ctx.run_id,
            call_id: call.id.clone(),
            tool: call.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(ExecutedCall {
            call: call.clone(),
            content,
            success,
            duration_ms,
        })
    }

    /// Resolve the call against the agent's registry and run it.
    ///
    /// `Ok((content, success))` is fed back to the model; `Err` aborts the
    /// run.
    async fn resolve_and_run(
        &self,
        agent: &AgentDefinition,
        call: &ToolCall,
        ctx: &RunContext,
    ) -> Result<(String, bool), Error> {
        let registry = agent.tools();

        let Some(tool) = registry.get(&call.name) else {
            warn!(tool = %call.name, agent = agent.name(), "Tool not found");
            if self.fail_on_unknown_tool {
                return Err(ToolError::NotFound(call.name.clone()).into());
            }
            return Ok((format!("Tool '{}' not found", call.name), false));
        };

        if let Err(e) = registry.validate_arguments(&call.name, &call.arguments) {
            debug!(tool = %call.name, error = %e, "Tool arguments rejected");
            return Ok((format!("Error: {e}"), false));
        }

        match tool.execute(call.arguments.clone(), ctx).await {
            Ok(output) => Ok((output.content, output.success)),
            Err(e) if e.is_fatal() => {
                warn!(tool = %call.name, error = %e, "Fatal tool error, aborting run");
                Err(e.into())
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                Ok((format!("Error: {e}"), false))
            }
        }
    }
}
