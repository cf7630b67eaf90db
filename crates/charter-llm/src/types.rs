use async_trait::async_trait;
use std::time::Duration;

use charter_utils::error::LlmError;

/// Sampling parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    #[must_use]
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

/// A text-generation backend.
///
/// The pipeline depends only on this trait. Backends are stateless between
/// calls and safe to share across tasks.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send a single-turn prompt and return the completion text.
    ///
    /// # Errors
    ///
    /// - `ProviderUnavailable` when the backend cannot be reached
    /// - `ProviderTimeout` when the call exceeds its duration
    /// - `ProviderRejected` when the backend refuses the request
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, LlmError>;

    /// Whether this backend can ground answers with web search.
    fn supports_web_search(&self) -> bool;

    /// Cheap liveness probe. Never errors and never blocks longer than the
    /// backend's health timeout.
    async fn health_check(&self) -> bool;
}

/// Run `generate` under an outer deadline.
///
/// Backends carry their own HTTP timeouts; this bounds the whole call,
/// including retries.
pub async fn generate_with_timeout(
    client: &dyn ProviderClient,
    prompt: &str,
    params: GenerationParams,
    timeout: Duration,
) -> Result<String, LlmError> {
    match tokio::time::timeout(timeout, client.generate(prompt, params)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::ProviderTimeout { duration: timeout }),
    }
}
