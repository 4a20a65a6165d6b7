//! Error types for the baton domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The top-level [`Error`]
//! covers the run-fatal taxonomy; each collaborator boundary has its own
//! error enum that either recovers locally or escalates into [`Error`].

use thiserror::Error;

use crate::guardrail::GuardrailKind;

/// The top-level error type for a run. Every variant is fatal to the run
/// that raised it; recoverable conditions (a single failing tool call, a
/// non-validating structured output) never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// The loop exhausted its turn budget without producing a final output.
    #[error("maximum turn count exceeded ({max_turns} turns)")]
    MaxTurnsExceeded { max_turns: u32 },

    /// A guardrail tripped. Never retried.
    #[error("guardrail '{guardrail}' ({kind}) tripped: {reason}")]
    GuardrailTripwire {
        guardrail: String,
        kind: GuardrailKind,
        reason: String,
    },

    /// The model requested a hand-off to an agent outside the active agent's
    /// hand-off set. Indicates a misconfigured agent graph.
    #[error("hand-off target '{target}' not reachable from agent '{from}'")]
    HandoffNotFound { from: String, target: String },

    /// The provider returned a response the loop cannot interpret.
    #[error("model behavior error: {0}")]
    ModelBehavior(String),

    /// The run was cancelled via its cancellation token.
    #[error("run cancelled")]
    Cancelled,

    // --- Collaborator boundaries ---
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("guardrail evaluation error: {0}")]
    Guardrail(#[from] GuardrailError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    // --- Configuration ---
    #[error("configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator boundary errors ---

/// Errors raised by a model provider. Transient conditions (rate limits,
/// timeouts) are retried at this boundary — e.g. by the fallback provider —
/// never by the orchestration loop itself.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Errors raised while resolving or executing a single tool call.
///
/// All variants except [`ToolError::Fatal`] are recovered locally: the
/// executor records them as an error result fed back to the model.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    /// Non-recoverable tool failure. Aborts the run instead of being fed
    /// back to the model.
    #[error("fatal tool error: {tool_name} — {reason}")]
    Fatal { tool_name: String, reason: String },
}

impl ToolError {
    /// Whether this error must abort the run rather than be recovered as an
    /// error result.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::Fatal { .. })
    }
}

/// A guardrail implementation itself failed to evaluate (distinct from a
/// guardrail tripping, which is a verdict, not an error).
#[derive(Debug, Error)]
pub enum GuardrailError {
    #[error("guardrail '{guardrail}' failed to evaluate: {reason}")]
    EvaluationFailed { guardrail: String, reason: String },
}

/// A JSON schema failed to compile.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema compilation failed: {0}")]
    Compile(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_turns_displays_limit() {
        let err = Error::MaxTurnsExceeded { max_turns: 5 };
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn guardrail_tripwire_displays_reason() {
        let err = Error::GuardrailTripwire {
            guardrail: "blocklist".into(),
            kind: GuardrailKind::Input,
            reason: "contains forbidden term".into(),
        };
        assert!(err.to_string().contains("blocklist"));
        assert!(err.to_string().contains("forbidden term"));
    }

    #[test]
    fn handoff_not_found_names_both_agents() {
        let err = Error::HandoffNotFound {
            from: "triage".into(),
            target: "billing".into(),
        };
        assert!(err.to_string().contains("triage"));
        assert!(err.to_string().contains("billing"));
    }

    #[test]
    fn tool_error_fatality() {
        let recoverable = ToolError::ExecutionFailed {
            tool_name: "calculator".into(),
            reason: "division by zero".into(),
        };
        assert!(!recoverable.is_fatal());

        let fatal = ToolError::Fatal {
            tool_name: "payments".into(),
            reason: "double charge detected".into(),
        };
        assert!(fatal.is_fatal());
    }

    #[test]
    fn provider_error_converts() {
        let err: Error = ProviderError::RateLimited { retry_after_secs: 30 }.into();
        assert!(err.to_string().contains("30"));
    }
}
