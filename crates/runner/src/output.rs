//! Final-output matching.
//!
//! Decides whether a text-only model response constitutes the active
//! agent's final output. Without an output schema any non-empty text is a
//! match. With a schema the text must parse as JSON and validate; a
//! non-validating response is *not* a match and the loop continues — the
//! model is expected to retry, bounded by the turn limit. The loop does not
//! distinguish "wrong shape" from "not done yet".

use baton_core::agent::FinalOutput;
use baton_core::error::Error;
use baton_core::schema::CompiledSchema;
use tracing::debug;

/// Match a text-only response against the output contract.
///
/// Returns `Ok(Some(..))` on a match, `Ok(None)` when the loop should
/// continue, and `Err` only when the response is uninterpretable.
pub fn match_final_output(
    text: &str,
    schema: Option<&CompiledSchema>,
) -> Result<Option<FinalOutput>, Error> {
    let Some(schema) = schema else {
        if text.is_empty() {
            return Err(Error::ModelBehavior(
                "response carried no text, tool calls, or hand-off".into(),
            ));
        }
        return Ok(Some(FinalOutput::Text(text.to_string())));
    };

    let candidate: serde_json::Value = match serde_json::from_str(text.trim()) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Structured output candidate is not JSON, continuing");
            return Ok(None);
        }
    };

    match schema.validate(&candidate) {
        Ok(()) => Ok(Some(FinalOutput::Structured(candidate))),
        Err(violation) => {
            debug!(violation = %violation, "Structured output failed validation, continuing");
            Ok(None)
        }
    }
}
