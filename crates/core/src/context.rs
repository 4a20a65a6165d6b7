//! Per-run context handed to tools, guardrails, and dynamic instructions.

use serde::Serialize;
use uuid::Uuid;

/// A lightweight snapshot of where a run currently is.
///
/// Rebuilt by the runner at every point where a collaborator is invoked, so
/// the `agent` field always names the currently active agent.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    /// Unique identifier of this run.
    pub run_id: Uuid,

    /// Name of the currently active agent.
    pub agent: String,

    /// The turn this invocation belongs to (0 before the first model call).
    pub turn: u32,
}

impl RunContext {
    pub fn new(run_id: Uuid, agent: impl Into<String>, turn: u32) -> Self {
        Self {
            run_id,
            agent: agent.into(),
            turn,
        }
    }
}
