//! Mutable per-run state threaded through the loop.

use std::sync::Arc;

use baton_core::agent::AgentDefinition;
use baton_core::message::Message;
use baton_core::provider::Usage;
use baton_core::RunContext;
use uuid::Uuid;

/// All state that accumulates during one run.
///
/// Owned and mutated exclusively by the runner; never shared across
/// concurrent runs. The active agent is an explicit field — never
/// process-wide state — so independent runs stay isolated. History is
/// append-only: items are pushed, never edited or removed.
#[derive(Debug)]
pub struct RunState {
    run_id: Uuid,
    input: String,
    history: Vec<Message>,
    active_agent: Arc<AgentDefinition>,
    turn: u32,
    usage: Usage,
}

impl RunState {
    /// Initialize state for a fresh run: the input becomes the first
    /// history item.
    pub fn new(agent: Arc<AgentDefinition>, input: impl Into<String>) -> Self {
        let input = input.into();
        Self {
            run_id: Uuid::new_v4(),
            history: vec![Message::user(&input)],
            input,
            active_agent: agent,
            turn: 0,
            usage: Usage::default(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The original user input.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The ordered history so far.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Append an item. History is append-only within a run.
    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// The currently active agent. Exactly one agent is active at any point.
    pub fn active_agent(&self) -> &Arc<AgentDefinition> {
        &self.active_agent
    }

    /// Install a new active agent after a hand-off. History is preserved.
    pub fn install_agent(&mut self, agent: Arc<AgentDefinition>) {
        self.active_agent = agent;
    }

    /// Advance to the given turn. Turn count is monotonically
    /// non-decreasing.
    pub fn begin_turn(&mut self, turn: u32) {
        debug_assert!(turn >= self.turn, "turn count must not decrease");
        self.turn = turn;
    }

    /// Turns consumed so far.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Fold a model call's usage into the running total.
    pub fn add_usage(&mut self, usage: Option<&Usage>) {
        if let Some(usage) = usage {
            self.usage.add(usage);
        }
    }

    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Snapshot context for collaborator invocations at the current turn.
    pub fn context(&self) -> RunContext {
        RunContext::new(self.run_id, self.active_agent.name(), self.turn)
    }

    /// Decompose into the parts a terminal result needs.
    pub(crate) fn into_parts(self) -> (Vec<Message>, u32, Usage, String) {
        let agent_name = self.active_agent.name().to_string();
        (self.history, self.turn, self.usage, agent_name)
    }
}
