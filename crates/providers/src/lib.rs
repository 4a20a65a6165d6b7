//! Model provider implementations for baton.
//!
//! - [`OpenAiCompatProvider`] speaks the OpenAI chat-completions dialect
//!   (OpenAI, OpenRouter, Ollama, vLLM, and most other endpoints)
//! - [`FallbackProvider`] wraps an ordered chain of providers and retries
//!   transient failures across them — the retry-at-the-provider-boundary
//!   the orchestration loop itself never performs

pub mod fallback;
pub mod openai_compat;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;
