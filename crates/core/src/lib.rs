//! # Baton Core
//!
//! Domain types, traits, and error definitions for the baton multi-agent
//! orchestration runtime. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestration loop is defined as a trait here:
//! model providers, tools, guardrails, trace sinks. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;
pub mod trace;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentBuilder, AgentDefinition, FinalOutput, HandoffSpec, Instructions, ModelSettings};
pub use context::RunContext;
pub use error::{Error, GuardrailError, ProviderError, Result, SchemaError, ToolError};
pub use guardrail::{Guardrail, GuardrailKind, GuardrailPayload, GuardrailVerdict};
pub use message::Message;
pub use provider::{ModelProvider, ModelRequest, ModelResponse, ResponseItem, StreamDelta, ToolDefinition, Usage};
pub use schema::CompiledSchema;
pub use tool::{Tool, ToolCall, ToolOutput, ToolRegistry};
pub use trace::{NoopSink, RunOutcome, TraceEvent, TraceSink};
