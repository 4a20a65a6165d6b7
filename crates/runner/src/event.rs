//! Run-level streaming events.
//!
//! `RunEvent` is the incremental protocol consumed by streaming callers:
//! a lazy, finite, forward-only sequence observed at the loop's suspension
//! points. Consuming it never alters loop state. Each event carries enough
//! payload to reconstruct the corresponding state transition.

use baton_core::agent::FinalOutput;
use baton_core::guardrail::GuardrailKind;
use baton_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted during a streamed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// Partial model text.
    #[serde(rename = "response.partial_text")]
    PartialText { delta: String },

    /// A tool call is about to execute.
    #[serde(rename = "tool_call.started")]
    ToolCallStarted {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },

    /// A tool call finished (successfully or with an error result).
    #[serde(rename = "tool_call.finished")]
    ToolCallFinished {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// Control transferred to another agent.
    #[serde(rename = "handoff.occurred")]
    HandoffOccurred { from: String, to: String },

    /// A guardrail tripped; the run is aborting.
    #[serde(rename = "guardrail.tripped")]
    GuardrailTripped {
        guardrail: String,
        kind: GuardrailKind,
        reason: String,
    },

    /// The run produced a final output.
    #[serde(rename = "run.completed")]
    RunCompleted {
        turns: u32,
        usage: Usage,
        output: FinalOutput,
    },

    /// The run terminated with an error (or was cancelled).
    #[serde(rename = "run.failed")]
    RunFailed { error: String },
}

impl RunEvent {
    /// Wire name for this event kind.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PartialText { .. } => "response.partial_text",
            Self::ToolCallStarted { .. } => "tool_call.started",
            Self::ToolCallFinished { .. } => "tool_call.finished",
            Self::HandoffOccurred { .. } => "handoff.occurred",
            Self::GuardrailTripped { .. } => "guardrail.tripped",
            Self::RunCompleted { .. } => "run.completed",
            Self::RunFailed { .. } => "run.failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_uses_dotted_names() {
        let event = RunEvent::PartialText { delta: "Hel".into() };
        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains(r#""type":"response.partial_text""#));
    }

    #[test]
    fn handoff_event_round_trips() {
        let event = RunEvent::HandoffOccurred {
            from: "triage".into(),
            to: "billing".into(),
        };
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: RunEvent = serde_json::from_str(&encoded).unwrap();
        match decoded {
            RunEvent::HandoffOccurred { from, to } => {
                assert_eq!(from, "triage");
                assert_eq!(to, "billing");
            }
            other => panic!("wrong variant: {}", other.event_type()),
        }
    }

    #[test]
    fn event_type_names_cover_all_variants() {
        assert_eq!(
            RunEvent::RunCompleted {
                turns: 1,
                usage: Usage::default(),
                output: FinalOutput::Text("done".into()),
            }
            .event_type(),
            "run.completed"
        );
        assert_eq!(
            RunEvent::RunFailed { error: "boom".into() }.event_type(),
            "run.failed"
        );
        assert_eq!(
            RunEvent::GuardrailTripped {
                guardrail: "g".into(),
                kind: GuardrailKind::Input,
                reason: "r".into(),
            }
            .event_type(),
            "guardrail.tripped"
        );
    }
}
