//! Terminal values of a run.

use baton_core::agent::FinalOutput;
use baton_core::error::Error;
use baton_core::message::Message;
use baton_core::provider::Usage;
use serde::de::DeserializeOwned;

use crate::state::RunState;

/// A successfully completed run.
#[derive(Debug)]
pub struct RunResult {
    /// The matched final output (typed per the agent's output contract).
    pub final_output: FinalOutput,

    /// The full conversation history, including the final assistant turn.
    pub history: Vec<Message>,

    /// Turns consumed.
    pub turns: u32,

    /// Accumulated token usage across all model calls.
    pub usage: Usage,

    /// Name of the agent that produced the final output.
    pub last_agent: String,
}

impl RunResult {
    pub(crate) fn new(state: RunState, final_output: FinalOutput) -> Self {
        let (history, turns, usage, last_agent) = state.into_parts();
        Self {
            final_output,
            history,
            turns,
            usage,
            last_agent,
        }
    }

    /// The final output rendered as a display string.
    pub fn output_text(&self) -> String {
        self.final_output.render()
    }

    /// Deserialize a structured final output into a concrete type.
    pub fn output_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value = match &self.final_output {
            FinalOutput::Text(s) => serde_json::Value::String(s.clone()),
            FinalOutput::Structured(v) => v.clone(),
        };
        serde_json::from_value(value)
    }
}

/// A failed (or cancelled) run: the error plus everything that happened up
/// to the failure point. History is not discarded.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: Error,

    /// Partial run state at the failure point.
    pub state: RunState,
}

impl RunFailure {
    /// Whether this run ended via its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Error::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::AgentDefinition;
    use serde::Deserialize;
    use serde_json::json;

    fn completed(output: FinalOutput) -> RunResult {
        let agent = AgentDefinition::builder("solo").build().unwrap();
        let state = RunState::new(agent, "input");
        RunResult::new(state, output)
    }

    #[test]
    fn output_text_renders_plain_text() {
        let result = completed(FinalOutput::Text("pong".into()));
        assert_eq!(result.output_text(), "pong");
        assert_eq!(result.last_agent, "solo");
    }

    #[test]
    fn output_as_deserializes_structured_payload() {
        #[derive(Deserialize)]
        struct Weather {
            city: String,
            temperature_c: f64,
        }

        let result = completed(FinalOutput::Structured(
            json!({"city": "Oslo", "temperature_c": -3.5}),
        ));
        let weather: Weather = result.output_as().unwrap();
        assert_eq!(weather.city, "Oslo");
        assert_eq!(weather.temperature_c, -3.5);
    }

    #[test]
    fn failure_keeps_partial_history() {
        let agent = AgentDefinition::builder("solo").build().unwrap();
        let state = RunState::new(agent, "input");
        let failure = RunFailure {
            error: Error::MaxTurnsExceeded { max_turns: 2 },
            state,
        };
        assert_eq!(failure.state.history().len(), 1);
        assert!(!failure.is_cancelled());
        assert!(failure.to_string().contains("maximum turn count"));
    }
}
