//! The orchestration state machine.

use std::sync::Arc;

use baton_core::agent::{AgentDefinition, FinalOutput};
use baton_core::error::{Error, ProviderError};
use baton_core::message::Message;
use baton_core::provider::{ModelProvider, ModelRequest, ModelResponse, ResponseItem, StreamDelta};
use baton_core::tool::ToolCall;
use baton_core::trace::{NoopSink, RunOutcome, TraceEvent, TraceSink};
use baton_guardrails::GuardrailEngine;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::event::RunEvent;
use crate::executor::ToolExecutor;
use crate::handoff::resolve_handoff;
use crate::output::match_final_output;
use crate::result::{RunFailure, RunResult};
use crate::state::RunState;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of model calls per run. Exceeding it fails the run
    /// with `MaxTurnsExceeded`, never a silent truncation.
    pub max_turns: u32,

    /// Upper bound on concurrently running tool calls within a turn.
    /// `None` runs each batch at full width.
    pub max_tool_concurrency: Option<usize>,

    /// Treat an unknown tool name as fatal instead of feeding an error
    /// result back to the model.
    pub fail_on_unknown_tool: bool,

    /// Re-run input guardrails before every model call, not only the first.
    pub guardrails_every_turn: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            max_tool_concurrency: None,
            fail_on_unknown_tool: false,
            guardrails_every_turn: false,
        }
    }
}

/// A streamed run: the event sequence plus a handle to the terminal result.
///
/// Events are read-only observation of the loop's suspension points;
/// consuming (or dropping) the receiver does not alter the run.
pub struct StreamedRun {
    pub events: mpsc::Receiver<RunEvent>,
    pub handle: tokio::task::JoinHandle<Result<RunResult, RunFailure>>,
}

/// The orchestration loop engine.
///
/// Holds the collaborators shared by every run it drives: the model
/// provider, the guardrail engine, and the trace sink. Each invocation owns
/// its own [`RunState`]; a `Runner` may drive any number of runs
/// concurrently.
#[derive(Clone)]
pub struct Runner {
    provider: Arc<dyn ModelProvider>,
    config: RunConfig,
    guardrails: Arc<GuardrailEngine>,
    sink: Arc<dyn TraceSink>,
}

impl Runner {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            config: RunConfig::default(),
            guardrails: Arc::new(GuardrailEngine::new()),
            sink: Arc::new(NoopSink),
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailEngine) -> Self {
        self.guardrails = Arc::new(guardrails);
        self
    }

    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Drive a run to completion.
    pub async fn run(
        &self,
        agent: Arc<AgentDefinition>,
        input: impl Into<String>,
    ) -> Result<RunResult, RunFailure> {
        self.run_inner(agent, input.into(), CancelToken::new(), None)
            .await
    }

    /// Drive a run with an external cancellation signal.
    pub async fn run_with_cancel(
        &self,
        agent: Arc<AgentDefinition>,
        input: impl Into<String>,
        cancel: CancelToken,
    ) -> Result<RunResult, RunFailure> {
        self.run_inner(agent, input.into(), cancel, None).await
    }

    /// Drive a run in the background, yielding incremental [`RunEvent`]s.
    pub fn run_streamed(
        &self,
        agent: Arc<AgentDefinition>,
        input: impl Into<String>,
    ) -> StreamedRun {
        self.run_streamed_with_cancel(agent, input, CancelToken::new())
    }

    /// Streamed run with an external cancellation signal.
    pub fn run_streamed_with_cancel(
        &self,
        agent: Arc<AgentDefinition>,
        input: impl Into<String>,
        cancel: CancelToken,
    ) -> StreamedRun {
        let (tx, rx) = mpsc::channel(256);
        let runner = self.clone();
        let input = input.into();
        let handle =
            tokio::spawn(async move { runner.run_inner(agent, input, cancel, Some(tx)).await });
        StreamedRun { events: rx, handle }
    }

    async fn run_inner(
        &self,
        agent: Arc<AgentDefinition>,
        input: String,
        cancel: CancelToken,
        events: Option<mpsc::Sender<RunEvent>>,
    ) -> Result<RunResult, RunFailure> {
        let mut state = RunState::new(agent, input);
        let events = events.as_ref();

        info!(
            run_id = %state.run_id(),
            agent = state.active_agent().name(),
            max_turns = self.config.max_turns,
            "Run started"
        );
        self.sink.record(&TraceEvent::RunStarted {
            run_id: state.run_id(),
            agent: state.active_agent().name().to_string(),
            timestamp: Utc::now(),
        });

        match self.drive(&mut state, &cancel, events).await {
            Ok(output) => {
                info!(
                    run_id = %state.run_id(),
                    turns = state.turn(),
                    total_tokens = state.usage().total_tokens,
                    "Run completed"
                );
                self.sink.record(&TraceEvent::RunFinished {
                    run_id: state.run_id(),
                    outcome: RunOutcome::Completed,
                    turns: state.turn(),
                    timestamp: Utc::now(),
                });
                emit(
                    events,
                    RunEvent::RunCompleted {
                        turns: state.turn(),
                        usage: *state.usage(),
                        output: output.clone(),
                    },
                )
                .await;
                Ok(RunResult::new(state, output))
            }
            Err(error) => {
                let outcome = if matches!(error, Error::Cancelled) {
                    RunOutcome::Cancelled
                } else {
                    RunOutcome::Failed
                };
                warn!(run_id = %state.run_id(), error = %error, outcome = %outcome, "Run did not complete");
                self.sink.record(&TraceEvent::RunFinished {
                    run_id: state.run_id(),
                    outcome,
                    turns: state.turn(),
                    timestamp: Utc::now(),
                });
                emit(events, RunEvent::RunFailed { error: error.to_string() }).await;
                Err(RunFailure { error, state })
            }
        }
    }

    /// The turn loop. Returns the matched final output or the fatal error.
    async fn drive(
        &self,
        state: &mut RunState,
        cancel: &CancelToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<FinalOutput, Error> {
        // Input guardrails run before the first model call; a trip aborts
        // without ever invoking the model.
        self.check_input_guardrails(state, events).await?;

        for turn in 1..=self.config.max_turns {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            state.begin_turn(turn);
            debug!(run_id = %state.run_id(), turn, agent = state.active_agent().name(), "Turn started");

            if turn > 1 && self.config.guardrails_every_turn {
                self.check_input_guardrails(state, events).await?;
            }

            let ctx = state.context();
            let agent = Arc::clone(state.active_agent());
            let request = build_request(&agent, state.history(), &ctx);

            self.sink.record(&TraceEvent::ModelCallStarted {
                run_id: state.run_id(),
                agent: agent.name().to_string(),
                turn,
                timestamp: Utc::now(),
            });

            // Exactly one model call is in flight per run; nothing else
            // mutates state while it is pending.
            let response = self.call_model(request, events).await?;

            state.add_usage(response.usage.as_ref());
            self.sink.record(&TraceEvent::ModelCallFinished {
                run_id: state.run_id(),
                agent: agent.name().to_string(),
                turn,
                usage: response.usage,
                timestamp: Utc::now(),
            });

            if response.items.is_empty() {
                return Err(Error::ModelBehavior(
                    "provider returned a response with no content items".into(),
                ));
            }

            let text = response.text();
            let calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
            let handoff_count = response
                .items
                .iter()
                .filter(|i| matches!(i, ResponseItem::Handoff { .. }))
                .count();
            if handoff_count > 1 {
                warn!(
                    run_id = %state.run_id(),
                    requested = handoff_count,
                    "Response carried multiple hand-offs; taking the first"
                );
            }

            // Hand-off takes precedence: tool calls in the same response are
            // not executed under the old agent's authority.
            if let Some(target) = response.handoff_target() {
                let from = agent.name().to_string();
                let next = resolve_handoff(&agent, target)?;

                if !calls.is_empty() {
                    warn!(
                        run_id = %state.run_id(),
                        skipped = calls.len(),
                        from = %from,
                        to = target,
                        "Hand-off suppressed accompanying tool calls"
                    );
                }
                if !text.is_empty() {
                    state.push(Message::assistant(&from, &text));
                }
                state.push(Message::handoff(&from, target, calls.len()));
                state.install_agent(next);

                self.sink.record(&TraceEvent::Handoff {
                    run_id: state.run_id(),
                    from: from.clone(),
                    to: target.to_string(),
                    timestamp: Utc::now(),
                });
                emit(
                    events,
                    RunEvent::HandoffOccurred {
                        from,
                        to: target.to_string(),
                    },
                )
                .await;
                continue;
            }

            if !calls.is_empty() {
                state.push(Message::assistant_with_calls(agent.name(), &text, calls.clone()));

                for call in &calls {
                    emit(
                        events,
                        RunEvent::ToolCallStarted {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    )
                    .await;
                }

                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let executor = ToolExecutor::new(
                    self.config.max_tool_concurrency,
                    self.config.fail_on_unknown_tool,
                );
                let executed = executor
                    .execute_batch(&agent, &calls, &ctx, self.sink.as_ref())
                    .await?;

                // Results append in request order before the next model call.
                for exec in &executed {
                    emit(
                        events,
                        RunEvent::ToolCallFinished {
                            id: exec.call.id.clone(),
                            name: exec.call.name.clone(),
                            output: exec.content.clone(),
                            success: exec.success,
                        },
                    )
                    .await;
                    state.push(exec.to_message());
                }

                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                continue;
            }

            // Text-only response: try to match the output contract.
            match match_final_output(&text, agent.output_schema())? {
                Some(output) => {
                    state.push(Message::assistant(agent.name(), &text));
                    self.check_output_guardrails(state, &output, events).await?;
                    return Ok(output);
                }
                None => {
                    // Not a match; the model retries with the attempt on
                    // record, bounded by the turn limit.
                    debug!(run_id = %state.run_id(), turn, "Output did not match contract, continuing");
                    state.push(Message::assistant(agent.name(), &text));
                }
            }
        }

        Err(Error::MaxTurnsExceeded {
            max_turns: self.config.max_turns,
        })
    }

    /// Invoke the provider, streaming partial text to `events` when present.
    async fn call_model(
        &self,
        request: ModelRequest,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<ModelResponse, Error> {
        let Some(tx) = events else {
            return Ok(self.provider.complete(request).await?);
        };

        let mut deltas = self.provider.stream(request).await?;
        let mut response = None;
        while let Some(delta) = deltas.recv().await {
            match delta? {
                StreamDelta::Text { delta } => {
                    let _ = tx.send(RunEvent::PartialText { delta }).await;
                }
                StreamDelta::Completed { response: complete } => {
                    response = Some(complete);
                }
            }
        }
        response.ok_or_else(|| {
            Error::Provider(ProviderError::StreamInterrupted(
                "stream ended without a completed response".into(),
            ))
        })
    }

    async fn check_input_guardrails(
        &self,
        state: &RunState,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<(), Error> {
        if self.guardrails.input_count() == 0 {
            return Ok(());
        }
        let ctx = state.context();
        if let Some(trip) = self
            .guardrails
            .check_input(state.input(), state.history(), &ctx)
            .await?
        {
            self.report_trip(state, &trip, events).await;
            return Err(Error::GuardrailTripwire {
                guardrail: trip.guardrail,
                kind: trip.kind,
                reason: trip.reason,
            });
        }
        Ok(())
    }

    async fn check_output_guardrails(
        &self,
        state: &RunState,
        output: &FinalOutput,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<(), Error> {
        if self.guardrails.output_count() == 0 {
            return Ok(());
        }
        let ctx = state.context();
        if let Some(trip) = self.guardrails.check_output(output, &ctx).await? {
            self.report_trip(state, &trip, events).await;
            return Err(Error::GuardrailTripwire {
                guardrail: trip.guardrail,
                kind: trip.kind,
                reason: trip.reason,
            });
        }
        Ok(())
    }

    async fn report_trip(
        &self,
        state: &RunState,
        trip: &baton_guardrails::Tripwire,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) {
        self.sink.record(&TraceEvent::GuardrailTripped {
            run_id: state.run_id(),
            guardrail: trip.guardrail.clone(),
            kind: trip.kind.to_string(),
            reason: trip.reason.clone(),
            timestamp: Utc::now(),
        });
        emit(
            events,
            RunEvent::GuardrailTripped {
                guardrail: trip.guardrail.clone(),
                kind: trip.kind,
                reason: trip.reason.clone(),
            },
        )
        .await;
    }
}

/// Build the provider request for the current turn.
fn build_request(
    agent: &AgentDefinition,
    history: &[Message],
    ctx: &baton_core::RunContext,
) -> ModelRequest {
    let settings = agent.model_settings();
    ModelRequest {
        model: settings.model.clone(),
        instructions: agent.resolve_instructions(ctx),
        history: history.to_vec(),
        tools: agent.tools().definitions(),
        handoffs: agent.handoff_specs(),
        output_schema: agent.output_schema().map(|s| s.raw().clone()),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}

async fn emit(events: Option<&mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        // A dropped or slow consumer must not fail the run.
        let _ = tx.send(event).await;
    }
}
