//! Hand-off resolution.
//!
//! Validates a requested transfer against the active agent's hand-off set
//! and returns the target definition. An unknown target — or one whose
//! definition has been dropped — is fatal: it indicates a misconfigured
//! agent graph, not a recoverable model mistake. Repeated hand-offs between
//! agents are legal and bounded only by the turn limit; no cycle detection
//! is performed.

use std::sync::Arc;

use baton_core::agent::AgentDefinition;
use baton_core::error::Error;

/// Resolve a hand-off request from `active` to `target`.
pub fn resolve_handoff(
    active: &AgentDefinition,
    target: &str,
) -> Result<Arc<AgentDefinition>, Error> {
    active
        .handoff_target(target)
        .ok_or_else(|| Error::HandoffNotFound {
            from: active.name().to_string(),
            target: target.to_string(),
        })
}
