//! Guardrail engine and built-in guardrails for baton.
//!
//! The engine evaluates an ordered set of guardrails against run input or a
//! candidate final output and reports the first trip, short-circuiting the
//! remainder. Built-in guardrails cover the common cases (keyword blocklist,
//! regex pattern, output length); anything else implements the
//! [`Guardrail`](baton_core::Guardrail) trait directly.

pub mod builtin;
pub mod engine;

pub use builtin::{GuardrailRule, GuardrailSpec, KeywordBlocklist, OutputLengthLimit, PatternGuardrail};
pub use engine::{GuardrailEngine, Tripwire};
