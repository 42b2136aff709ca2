//! Status command handler.
//!
//! Checks the vector search service and the generation backend.

use super::{llm_client, search_client};
use clap::Args;
use ragstack_core::{config::AppConfig, AppResult};

/// Check that the search service and the generation backend answer
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    /// Execute the status command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let search = search_client(config)?;
        let llm = llm_client(config)?;

        let (search_health, models) = tokio::join!(search.health(), llm.list_models());

        let search_error = search_health.err().map(|e| e.to_string());
        let (models, llm_error) = match models {
            Ok(models) => (models, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };
        let model_available = models.iter().any(|m| model_matches(m, &config.model));

        if self.json {
            let output = serde_json::json!({
                "search": {
                    "url": config.services.search_url,
                    "ok": search_error.is_none(),
                    "error": search_error,
                },
                "generation": {
                    "url": config.services.ollama_url,
                    "ok": llm_error.is_none(),
                    "error": llm_error,
                    "model": config.model,
                    "modelAvailable": model_available,
                    "models": models,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Search service: {}", config.services.search_url);
            match &search_error {
                None => println!("  Status: ok"),
                Some(e) => println!("  Status: unavailable ({})", e),
            }

            println!("Generation backend: {}", config.services.ollama_url);
            match &llm_error {
                None => {
                    println!("  Status: ok ({} models)", models.len());
                    println!(
                        "  Model {}: {}",
                        config.model,
                        if model_available { "available" } else { "not pulled" }
                    );
                }
                Some(e) => println!("  Status: unavailable ({})", e),
            }
        }

        Ok(())
    }
}

/// Ollama tags carry an implicit `:latest`.
fn model_matches(available: &str, wanted: &str) -> bool {
    available == wanted || available.strip_suffix(":latest") == Some(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matches_latest_tag() {
        assert!(model_matches("llama3.2:latest", "llama3.2"));
        assert!(model_matches("llama3.2:1b", "llama3.2:1b"));
        assert!(!model_matches("mistral:latest", "llama3.2"));
    }
}
