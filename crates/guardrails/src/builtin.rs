//! Built-in guardrails and their declarative configuration form.

use std::sync::Arc;

use async_trait::async_trait;
use baton_core::error::{Error, GuardrailError};
use baton_core::guardrail::{Guardrail, GuardrailKind, GuardrailPayload, GuardrailVerdict};
use baton_core::RunContext;
use serde::{Deserialize, Serialize};

/// Declarative form of a built-in guardrail, loadable from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailSpec {
    /// Unique name, reported on trips.
    pub name: String,

    /// Which boundary this guardrail checks.
    pub kind: GuardrailKind,

    #[serde(flatten)]
    pub rule: GuardrailRule,
}

/// The check a built-in guardrail performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GuardrailRule {
    /// Trip when the content contains any listed keyword
    /// (case-insensitive).
    KeywordBlocklist { keywords: Vec<String> },

    /// Trip when the content matches the regex.
    Pattern { pattern: String },

    /// Trip when the content exceeds `max_chars` characters.
    /// Only meaningful for output guardrails.
    MaxLength { max_chars: usize },
}

/// Instantiate a built-in guardrail from its spec.
pub fn from_spec(spec: &GuardrailSpec) -> Result<Arc<dyn Guardrail>, Error> {
    match &spec.rule {
        GuardrailRule::KeywordBlocklist { keywords } => Ok(Arc::new(KeywordBlocklist::new(
            &spec.name,
            spec.kind,
            keywords.clone(),
        ))),
        GuardrailRule::Pattern { pattern } => {
            Ok(Arc::new(PatternGuardrail::new(&spec.name, spec.kind, pattern)?))
        }
        GuardrailRule::MaxLength { max_chars } => {
            Ok(Arc::new(OutputLengthLimit::new(&spec.name, *max_chars)))
        }
    }
}

/// Trips when the inspected content contains any blocked keyword.
pub struct KeywordBlocklist {
    name: String,
    kind: GuardrailKind,
    /// Lowercased at construction; matching is case-insensitive.
    keywords: Vec<String>,
}

impl KeywordBlocklist {
    pub fn new(name: impl Into<String>, kind: GuardrailKind, keywords: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl Guardrail for KeywordBlocklist {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> GuardrailKind {
        self.kind
    }

    async fn evaluate(
        &self,
        payload: &GuardrailPayload<'_>,
        _ctx: &RunContext,
    ) -> std::result::Result<GuardrailVerdict, GuardrailError> {
        let content = payload.content().to_lowercase();
        for keyword in &self.keywords {
            if content.contains(keyword) {
                return Ok(GuardrailVerdict::trip(format!(
                    "content contains blocked keyword '{keyword}'"
                )));
            }
        }
        Ok(GuardrailVerdict::pass())
    }
}

/// Trips when the inspected content matches a regex.
pub struct PatternGuardrail {
    name: String,
    kind: GuardrailKind,
    pattern: regex_lite::Regex,
}

impl PatternGuardrail {
    pub fn new(
        name: impl Into<String>,
        kind: GuardrailKind,
        pattern: &str,
    ) -> Result<Self, Error> {
        let pattern = regex_lite::Regex::new(pattern).map_err(|e| Error::Config {
            message: format!("invalid guardrail pattern: {e}"),
        })?;
        Ok(Self {
            name: name.into(),
            kind,
            pattern,
        })
    }
}

#[async_trait]
impl Guardrail for PatternGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> GuardrailKind {
        self.kind
    }

    async fn evaluate(
        &self,
        payload: &GuardrailPayload<'_>,
        _ctx: &RunContext,
    ) -> std::result::Result<GuardrailVerdict, GuardrailError> {
        let content = payload.content();
        if let Some(found) = self.pattern.find(&content) {
            return Ok(GuardrailVerdict::trip(format!(
                "content matches pattern '{}' at byte {}",
                self.pattern.as_str(),
                found.start()
            )));
        }
        Ok(GuardrailVerdict::pass())
    }
}

/// Trips when the final output exceeds a character budget.
pub struct OutputLengthLimit {
    name: String,
    max_chars: usize,
}

impl OutputLengthLimit {
    pub fn new(name: impl Into<String>, max_chars: usize) -> Self {
        Self {
            name: name.into(),
            max_chars,
        }
    }
}

#[async_trait]
impl Guardrail for OutputLengthLimit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> GuardrailKind {
        GuardrailKind::Output
    }

    async fn evaluate(
        &self,
        payload: &GuardrailPayload<'_>,
        _ctx: &RunContext,
    ) -> std::result::Result<GuardrailVerdict, GuardrailError> {
        let len = payload.content().chars().count();
        if len > self.max_chars {
            return Ok(GuardrailVerdict::trip(format!(
                "output is {len} characters, limit is {}",
                self.max_chars
            )));
        }
        Ok(GuardrailVerdict::pass())
    }
}
