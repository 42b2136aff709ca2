//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a client.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use ragstack_core::config::DEFAULT_OLLAMA_URL;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier (only "ollama" today)
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout` - Per-request timeout applied to every call
///
/// # Errors
/// Returns error if the provider is unknown or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            let client =
                OllamaClient::with_base_url(base_url, timeout).map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        _ => Err(format!("Unknown provider: {}", provider)),
    }
}
