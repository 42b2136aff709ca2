//! Generation backend crate for ragstack.
//!
//! This crate provides a provider-agnostic abstraction over text generation
//! backends, plus the sampling parameter model shared with the orchestrator.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use ragstack_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new(Duration::from_secs(60))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::{ResolvedSampling, SamplingParams};
