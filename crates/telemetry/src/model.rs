//! Trace data model — per-run aggregates and global totals.

use baton_core::provider::Usage;
use baton_core::trace::{RunOutcome, TraceEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything recorded about one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    pub run_id: Uuid,

    /// The agent the run started with.
    pub agent: String,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Terminal outcome; `None` while the run is still in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,

    pub turns: u32,
    pub model_calls: u32,
    pub tool_calls: u32,
    pub handoffs: u32,
    pub guardrail_trips: u32,

    /// Accumulated token usage.
    pub usage: Usage,

    /// The full ordered event log.
    pub events: Vec<TraceEvent>,
}

impl RunTrace {
    pub(crate) fn started(run_id: Uuid, agent: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            agent,
            started_at,
            finished_at: None,
            outcome: None,
            turns: 0,
            model_calls: 0,
            tool_calls: 0,
            handoffs: 0,
            guardrail_trips: 0,
            usage: Usage::default(),
            events: Vec::new(),
        }
    }

    /// Whether the run has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Aggregate counters across all recorded runs (including evicted ones).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunTotals {
    pub runs: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub model_calls: u64,
    pub tool_calls: u64,
    pub handoffs: u64,
    pub guardrail_trips: u64,
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_trace_is_unfinished() {
        let trace = RunTrace::started(Uuid::new_v4(), "triage".into(), Utc::now());
        assert!(!trace.is_finished());
        assert_eq!(trace.model_calls, 0);
    }

    #[test]
    fn trace_serializes_without_optional_fields() {
        let trace = RunTrace::started(Uuid::new_v4(), "triage".into(), Utc::now());
        let encoded = serde_json::to_string(&trace).unwrap();
        assert!(!encoded.contains("finished_at"));
        assert!(!encoded.contains("outcome"));
    }
}
