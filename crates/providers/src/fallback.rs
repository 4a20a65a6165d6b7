//! Provider fallback — an ordered retry chain with per-provider timeouts.
//!
//! Transient provider failures (timeouts, rate limits, 5xx) are this
//! boundary's concern: the orchestration loop never retries a model call,
//! it just sees the chain as one provider that either answers or fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use baton_core::error::ProviderError;
use baton_core::provider::{ModelProvider, ModelRequest, ModelResponse, StreamDelta};
use tracing::{info, warn};

/// Wraps an ordered list of providers and falls through on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    provider: Arc<dyn ModelProvider>,
    timeout: Duration,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

impl FallbackProvider {
    /// Create an empty chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Append a provider with a custom timeout.
    pub fn add(mut self, provider: Arc<dyn ModelProvider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, timeout });
        self
    }

    /// Append a provider with the default timeout.
    pub fn add_default(self, provider: Arc<dyn ModelProvider>) -> Self {
        self.add(provider, DEFAULT_TIMEOUT)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl ModelProvider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let mut last_error =
            ProviderError::NotConfigured("no providers in fallback chain".into());

        for (attempt, entry) in self.chain.iter().enumerate() {
            let provider_name = entry.provider.name().to_string();
            info!(
                provider = %provider_name,
                attempt = attempt + 1,
                total = self.chain.len(),
                "Fallback: trying provider"
            );

            match tokio::time::timeout(entry.timeout, entry.provider.complete(request.clone()))
                .await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(provider = %provider_name, error = %e, "Fallback: provider failed, trying next");
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        provider = %provider_name,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: provider timed out, trying next"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "provider '{}' timed out after {}s",
                        provider_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }

    async fn stream(
        &self,
        request: ModelRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<StreamDelta, ProviderError>>,
        ProviderError,
    > {
        let mut last_error =
            ProviderError::NotConfigured("no providers in fallback chain".into());

        for (attempt, entry) in self.chain.iter().enumerate() {
            let provider_name = entry.provider.name().to_string();
            info!(
                provider = %provider_name,
                attempt = attempt + 1,
                total = self.chain.len(),
                "Fallback: trying provider (streaming)"
            );

            match tokio::time::timeout(entry.timeout, entry.provider.stream(request.clone()))
                .await
            {
                Ok(Ok(rx)) => return Ok(rx),
                Ok(Err(e)) => {
                    warn!(provider = %provider_name, error = %e, "Fallback: provider stream failed, trying next");
                    last_error = e;
                }
                Err(_) => {
                    last_error = ProviderError::Timeout(format!(
                        "provider '{}' stream timed out after {}s",
                        provider_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }
}
