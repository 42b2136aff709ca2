//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ResolvedSampling;
use ragstack_core::config::DEFAULT_OLLAMA_URL;
use ragstack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "ollama";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: ResolvedSampling,
}

/// Ollama API response format.
///
/// Some Ollama-compatible proxies answer with `text` instead of `response`.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(alias = "text")]
    response: String,
    #[serde(default = "default_done")]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

fn default_done() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// Per-request timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client against the default local endpoint.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_OLLAMA_URL, timeout)
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            stream: false,
            options: request.sampling.resolve(),
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse, requested_model: &str) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            usage,
            done: response.done,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Generation(format!(
                "Ollama did not answer within {}s",
                self.timeout.as_secs()
            ))
        } else {
            AppError::Generation(format!("Failed to send request to Ollama: {}", e))
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to Ollama");
        tracing::debug!("Request: {:?}", request);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let ollama_response: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::malformed(SERVICE, format!("unexpected response body: {}", e)))?;

        tracing::info!("Received completion from Ollama");
        tracing::debug!("Response: {:?}", ollama_response);

        Ok(self.convert_response(ollama_response, &request.model))
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(AppError::Generation(format!(
                "Ollama API error ({})",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let tags: OllamaTags = serde_json::from_str(&body)
            .map_err(|e| AppError::malformed(SERVICE, format!("unexpected tags body: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
