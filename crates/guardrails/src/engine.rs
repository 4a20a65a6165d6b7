//! Guardrail evaluation engine.
//!
//! Runs all guardrails of the relevant kind in configuration order and
//! reports the first failure, short-circuiting the remainder. A trip always
//! aborts the run; it is never retried.

use std::sync::Arc;

use baton_core::error::GuardrailError;
use baton_core::guardrail::{Guardrail, GuardrailKind, GuardrailPayload};
use baton_core::message::Message;
use baton_core::{FinalOutput, RunContext};
use tracing::{debug, warn};

use crate::builtin::{self, GuardrailSpec};

/// A reported guardrail trip: which guardrail, at which boundary, and why.
#[derive(Debug, Clone)]
pub struct Tripwire {
    pub guardrail: String,
    pub kind: GuardrailKind,
    pub reason: String,
}

/// Holds the configured guardrails, split by kind, in configuration order.
#[derive(Default)]
pub struct GuardrailEngine {
    input: Vec<Arc<dyn Guardrail>>,
    output: Vec<Arc<dyn Guardrail>>,
}

impl GuardrailEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from declarative specs (configuration order is
    /// evaluation order).
    pub fn from_specs(specs: &[GuardrailSpec]) -> baton_core::Result<Self> {
        let mut engine = Self::new();
        for spec in specs {
            engine.add(builtin::from_spec(spec)?);
        }
        Ok(engine)
    }

    /// Register a guardrail. Evaluation order follows registration order
    /// within each kind.
    pub fn add(&mut self, guardrail: Arc<dyn Guardrail>) {
        match guardrail.kind() {
            GuardrailKind::Input => self.input.push(guardrail),
            GuardrailKind::Output => self.output.push(guardrail),
        }
    }

    /// Builder-style registration.
    pub fn with(mut self, guardrail: Arc<dyn Guardrail>) -> Self {
        self.add(guardrail);
        self
    }

    pub fn input_count(&self) -> usize {
        self.input.len()
    }

    pub fn output_count(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }

    /// Evaluate input guardrails against the input/history snapshot.
    /// Returns the first trip, or `None` when all pass.
    pub async fn check_input(
        &self,
        input: &str,
        history: &[Message],
        ctx: &RunContext,
    ) -> std::result::Result<Option<Tripwire>, GuardrailError> {
        let payload = GuardrailPayload::Input { input, history };
        self.evaluate(&self.input, &payload, ctx).await
    }

    /// Evaluate output guardrails against a candidate final output.
    pub async fn check_output(
        &self,
        output: &FinalOutput,
        ctx: &RunContext,
    ) -> std::result::Result<Option<Tripwire>, GuardrailError> {
        let payload = GuardrailPayload::Output { output };
        self.evaluate(&self.output, &payload, ctx).await
    }

    async fn evaluate(
        &self,
        guardrails: &[Arc<dyn Guardrail>],
        payload: &GuardrailPayload<'_>,
        ctx: &RunContext,
    ) -> std::result::Result<Option<Tripwire>, GuardrailError> {
        for guardrail in guardrails {
            let verdict = guardrail.evaluate(payload, ctx).await?;
            match verdict {
                baton_core::GuardrailVerdict::Pass => {
                    debug!(guardrail = guardrail.name(), "Guardrail passed");
                }
                baton_core::GuardrailVerdict::Trip { reason } => {
                    warn!(
                        guardrail = guardrail.name(),
                        kind = %guardrail.kind(),
                        reason = %reason,
                        "Guardrail tripped"
                    );
                    return Ok(Some(Tripwire {
                        guardrail: guardrail.name().to_string(),
                        kind: guardrail.kind(),
                        reason,
                    }));
                }
            }
        }
        Ok(None)
    }
}
