//! The orchestration loop — the heart of baton.
//!
//! The runner drives a single run as a state machine:
//!
//! 1. **Guardrails** — input checks run before the first model call (and,
//!    when configured, before every call); a trip aborts without calling
//!    the model
//! 2. **Model call** — the active agent's instructions, full history, tool
//!    specs, and output schema go to the provider; exactly one call is in
//!    flight per run
//! 3. **Dispatch** — the parsed response either hands off to another agent
//!    (which wins over any tool calls in the same response), executes tool
//!    calls concurrently, or matches the agent's final-output contract
//! 4. **Termination** — a matched output passes output guardrails and ends
//!    the run; exhausting the turn budget, a tripped guardrail, an invalid
//!    hand-off, or an uninterpretable response ends it with a failure that
//!    carries the partial run state
//!
//! Independent runs share no mutable state and may execute fully in
//! parallel.

pub mod cancel;
pub mod event;
pub mod executor;
pub mod handoff;
pub mod output;
pub mod result;
pub mod runner;
pub mod state;

pub use cancel::CancelToken;
pub use event::RunEvent;
pub use executor::{ExecutedCall, ToolExecutor};
pub use result::{RunFailure, RunResult};
pub use runner::{RunConfig, Runner, StreamedRun};
pub use state::RunState;
