//! Command handlers for the ragstack CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod context;
pub mod history;
pub mod status;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use context::ContextCommand;
pub use history::HistoryCommand;
pub use status::StatusCommand;

use ragstack_core::{config::AppConfig, AppError, AppResult};
use ragstack_llm::{create_client, LlmClient};
use ragstack_prompt::PromptBuilder;
use ragstack_rag::{config::load_config, HttpSearchClient, QueryOrchestrator, SearchService};
use std::sync::Arc;

/// Build the search client from the services section.
pub fn search_client(config: &AppConfig) -> AppResult<Arc<dyn SearchService>> {
    let client = HttpSearchClient::with_base_url(
        &config.services.search_url,
        config.services.search_timeout(),
    )?;
    Ok(Arc::new(client))
}

/// Build the generation client from the services section.
pub fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    create_client(
        "ollama",
        Some(config.services.ollama_url.as_str()),
        config.services.generation_timeout(),
    )
    .map_err(AppError::Config)
}

/// Wire an orchestrator for the workspace, applying prompt overrides.
pub fn build_orchestrator(config: &AppConfig) -> AppResult<QueryOrchestrator> {
    let orchestrator_config = load_config(&config.workspace)?;
    let prompts = PromptBuilder::from_workspace(&config.workspace, orchestrator_config.prompt)?;

    tracing::debug!(
        search_url = %config.services.search_url,
        ollama_url = %config.services.ollama_url,
        "Building orchestrator"
    );

    Ok(
        QueryOrchestrator::new(search_client(config)?, llm_client(config)?, orchestrator_config)?
            .with_prompt_builder(prompts),
    )
}
