//! Guardrail trait — pass/fail safety checks on input and output content.
//!
//! Guardrails are independent, side-effect-free checks expressed as a
//! capability interface with interchangeable implementations. Tripping is a
//! verdict, not an error; a guardrail that cannot evaluate at all raises
//! [`GuardrailError`].

use std::borrow::Cow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::FinalOutput;
use crate::context::RunContext;
use crate::error::GuardrailError;
use crate::message::Message;

/// Which boundary a guardrail checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailKind {
    /// Runs against the input/history snapshot before the model is called.
    Input,
    /// Runs against a matched final output before the run terminates.
    Output,
}

impl std::fmt::Display for GuardrailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardrailKind::Input => f.write_str("input"),
            GuardrailKind::Output => f.write_str("output"),
        }
    }
}

/// What a guardrail evaluates.
#[derive(Debug)]
pub enum GuardrailPayload<'a> {
    /// The user input plus the history snapshot at evaluation time.
    Input {
        input: &'a str,
        history: &'a [Message],
    },
    /// The candidate final output.
    Output { output: &'a FinalOutput },
}

impl GuardrailPayload<'_> {
    /// The textual content most guardrails inspect: the raw input, or the
    /// rendered final output.
    pub fn content(&self) -> Cow<'_, str> {
        match self {
            GuardrailPayload::Input { input, .. } => Cow::Borrowed(input),
            GuardrailPayload::Output { output } => match output {
                FinalOutput::Text(s) => Cow::Borrowed(s.as_str()),
                FinalOutput::Structured(v) => Cow::Owned(v.to_string()),
            },
        }
    }
}

/// The outcome of one guardrail evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GuardrailVerdict {
    Pass,
    Trip { reason: String },
}

impl GuardrailVerdict {
    pub fn pass() -> Self {
        GuardrailVerdict::Pass
    }

    pub fn trip(reason: impl Into<String>) -> Self {
        GuardrailVerdict::Trip {
            reason: reason.into(),
        }
    }

    pub fn is_trip(&self) -> bool {
        matches!(self, GuardrailVerdict::Trip { .. })
    }
}

/// The core guardrail trait.
#[async_trait]
pub trait Guardrail: Send + Sync {
    /// Unique name, used in trip reports.
    fn name(&self) -> &str;

    /// Which boundary this guardrail applies to.
    fn kind(&self) -> GuardrailKind;

    /// Evaluate the payload. A `Trip` verdict aborts the run; it is never
    /// retried.
    async fn evaluate(
        &self,
        payload: &GuardrailPayload<'_>,
        ctx: &RunContext,
    ) -> std::result::Result<GuardrailVerdict, GuardrailError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_display() {
        assert_eq!(GuardrailKind::Input.to_string(), "input");
        assert_eq!(GuardrailKind::Output.to_string(), "output");
    }

    #[test]
    fn verdict_predicates() {
        assert!(!GuardrailVerdict::pass().is_trip());
        assert!(GuardrailVerdict::trip("nope").is_trip());
    }

    #[test]
    fn input_payload_content_is_input() {
        let history = vec![Message::user("hi")];
        let payload = GuardrailPayload::Input {
            input: "hi",
            history: &history,
        };
        assert_eq!(payload.content(), "hi");
    }

    #[test]
    fn structured_output_content_renders_json() {
        let output = FinalOutput::Structured(json!({"ok": true}));
        let payload = GuardrailPayload::Output { output: &output };
        assert_eq!(payload.content(), r#"{"ok":true}"#);
    }
}
