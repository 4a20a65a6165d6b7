//! In-memory trace collection and the tracing-facade sink.

use std::sync::RwLock;

use baton_core::trace::{RunOutcome, TraceEvent, TraceSink};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{RunTotals, RunTrace};

/// Oldest finished runs are evicted beyond this bound.
const MAX_RETAINED_RUNS: usize = 1_000;

/// Collects traces in memory, grouped per run, with global totals that
/// survive eviction. Thread-safe via `RwLock`; lock poisoning is swallowed
/// because recording must never fail the run.
#[derive(Default)]
pub struct InMemoryTraceSink {
    runs: RwLock<Vec<RunTrace>>,
    totals: RwLock<RunTotals>,
}

impl InMemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All retained run traces, oldest first.
    pub fn runs(&self) -> Vec<RunTrace> {
        self.runs.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// One run's trace, if retained.
    pub fn run(&self, run_id: Uuid) -> Option<RunTrace> {
        self.runs
            .read()
            .ok()
            .and_then(|runs| runs.iter().find(|t| t.run_id == run_id).cloned())
    }

    /// Aggregate counters across all recorded runs.
    pub fn totals(&self) -> RunTotals {
        self.totals.read().map(|t| *t).unwrap_or_default()
    }

    fn with_run(&self, run_id: Uuid, apply: impl FnOnce(&mut RunTrace)) {
        let Ok(mut runs) = self.runs.write() else {
            return;
        };
        match runs.iter_mut().find(|t| t.run_id == run_id) {
            Some(trace) => apply(trace),
            None => debug!(%run_id, "Trace event for unknown run, dropping"),
        }
    }
}

impl TraceSink for InMemoryTraceSink {
    fn record(&self, event: &TraceEvent) {
        match event {
            TraceEvent::RunStarted { run_id, agent, timestamp } => {
                let Ok(mut runs) = self.runs.write() else {
                    return;
                };
                let mut trace = RunTrace::started(*run_id, agent.clone(), *timestamp);
                trace.events.push(event.clone());
                runs.push(trace);
                if runs.len() > MAX_RETAINED_RUNS {
                    runs.remove(0);
                }
                if let Ok(mut totals) = self.totals.write() {
                    totals.runs += 1;
                }
            }

            TraceEvent::ModelCallStarted { run_id, turn, .. } => {
                self.with_run(*run_id, |trace| {
                    trace.model_calls += 1;
                    trace.turns = trace.turns.max(*turn);
                    trace.events.push(event.clone());
                });
                if let Ok(mut totals) = self.totals.write() {
                    totals.model_calls += 1;
                }
            }

            TraceEvent::ModelCallFinished { run_id, usage, .. } => {
                self.with_run(*run_id, |trace| {
                    if let Some(usage) = usage {
                        trace.usage.add(usage);
                    }
                    trace.events.push(event.clone());
                });
                if let Some(usage) = usage {
                    if let Ok(mut totals) = self.totals.write() {
                        totals.usage.add(usage);
                    }
                }
            }

            TraceEvent::ToolCallStarted { run_id, .. } => {
                self.with_run(*run_id, |trace| {
                    trace.tool_calls += 1;
                    trace.events.push(event.clone());
                });
                if let Ok(mut totals) = self.totals.write() {
                    totals.tool_calls += 1;
                }
            }

            TraceEvent::ToolCallFinished { run_id, .. } => {
                self.with_run(*run_id, |trace| trace.events.push(event.clone()));
            }

            TraceEvent::Handoff { run_id, .. } => {
                self.with_run(*run_id, |trace| {
                    trace.handoffs += 1;
                    trace.events.push(event.clone());
                });
                if let Ok(mut totals) = self.totals.write() {
                    totals.handoffs += 1;
                }
            }

            TraceEvent::GuardrailTripped { run_id, .. } => {
                self.with_run(*run_id, |trace| {
                    trace.guardrail_trips += 1;
                    trace.events.push(event.clone());
                });
                if let Ok(mut totals) = self.totals.write() {
                    totals.guardrail_trips += 1;
                }
            }

            TraceEvent::RunFinished { run_id, outcome, turns, timestamp } => {
                self.with_run(*run_id, |trace| {
                    trace.outcome = Some(*outcome);
                    trace.turns = *turns;
                    trace.finished_at = Some(*timestamp);
                    trace.events.push(event.clone());
                });
                if let Ok(mut totals) = self.totals.write() {
                    match outcome {
                        RunOutcome::Completed => totals.completed += 1,
                        RunOutcome::Failed => totals.failed += 1,
                        RunOutcome::Cancelled => totals.cancelled += 1,
                    }
                }
            }
        }
    }
}

/// Forwards trace events to the `tracing` facade as structured log records.
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, event: &TraceEvent) {
        match event {
            TraceEvent::RunStarted { run_id, agent, .. } => {
                info!(%run_id, %agent, "trace: run started");
            }
            TraceEvent::ModelCallStarted { run_id, agent, turn, .. } => {
                debug!(%run_id, %agent, turn, "trace: model call started");
            }
            TraceEvent::ModelCallFinished { run_id, agent, turn, usage, .. } => {
                debug!(
                    %run_id,
                    %agent,
                    turn,
                    tokens = usage.map(|u| u.total_tokens).unwrap_or(0),
                    "trace: model call finished"
                );
            }
            TraceEvent::ToolCallStarted { run_id, tool, call_id, .. } => {
                debug!(%run_id, %tool, %call_id, "trace: tool call started");
            }
            TraceEvent::ToolCallFinished { run_id, tool, success, duration_ms, .. } => {
                debug!(%run_id, %tool, success, duration_ms, "trace: tool call finished");
            }
            TraceEvent::Handoff { run_id, from, to, .. } => {
                info!(%run_id, %from, %to, "trace: hand-off");
            }
            TraceEvent::GuardrailTripped { run_id, guardrail, reason, .. } => {
                warn!(%run_id, %guardrail, %reason, "trace: guardrail tripped");
            }
            TraceEvent::RunFinished { run_id, outcome, turns, .. } => {
                info!(%run_id, %outcome, turns, "trace: run finished");
            }
        }
    }
}
