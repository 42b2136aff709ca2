//! LLM client abstraction and request/response types.
//!
//! This module defines the core abstractions for interacting with generation backends.

use crate::types::SamplingParams;
use ragstack_core::AppResult;
use serde::{Deserialize, Serialize};

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Model identifier (e.g., "llama3.2", "mistral")
    pub model: String,

    /// Sampling parameters; clamped by the provider before sending
    #[serde(default)]
    pub sampling: SamplingParams,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl LlmRequest {
    /// Create a new LLM request with default sampling.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            sampling: SamplingParams::default(),
            system: None,
        }
    }

    /// Replace the sampling parameters.
    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.sampling.temperature = temperature;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: i64) -> Self {
        self.sampling.num_predict = max_tokens;
        self
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,

    /// Whether the response was complete
    #[serde(default = "default_true")]
    pub done: bool,
}

fn default_true() -> bool {
    true
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Trait for generation backends.
///
/// This trait abstracts the underlying provider (Ollama today) so the
/// orchestrator and its tests can swap in any implementation.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a single, non-streaming completion.
    ///
    /// Exactly one attempt is made; failures surface as
    /// `AppError::Generation` or `AppError::MalformedPayload`.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// List the models the backend can serve.
    async fn list_models(&self) -> AppResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Generate raw text for a prompt.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        sampling: &SamplingParams,
    ) -> AppResult<String> {
        let request = LlmRequest::new(prompt, model).with_sampling(*sampling);
        Ok(self.complete(&request).await?.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = LlmRequest::new("Hello", "llama3.2")
            .with_temperature(0.1)
            .with_max_tokens(200)
            .with_system("Be brief");

        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.sampling.temperature, 0.1);
        assert_eq!(request.sampling.num_predict, 200);
        assert_eq!(request.system.as_deref(), Some("Be brief"));
    }

    #[test]
    fn test_usage_totals() {
        let usage = LlmUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }
}
