//! Context command handler.

use super::build_orchestrator;
use clap::Args;
use ragstack_core::{config::AppConfig, AppResult};

/// Print the system context the orchestrator would add to prompts
#[derive(Args, Debug)]
pub struct ContextCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ContextCommand {
    /// Execute the context command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing context command");

        let orchestrator = build_orchestrator(config)?;
        let context = orchestrator.get_system_context().await;

        if self.json {
            let output = serde_json::json!({
                "systemContext": context,
                "ttlSecs": orchestrator.config().system_context_ttl_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", context);
        }

        Ok(())
    }
}
