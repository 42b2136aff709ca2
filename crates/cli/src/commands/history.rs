//! History command handler.

use clap::{Args, Subcommand};
use ragstack_core::{config::AppConfig, AppResult};
use ragstack_rag::{ConversationLog, JsonlConversationLog};

/// Inspect stored conversations
#[derive(Args, Debug)]
pub struct HistoryCommand {
    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List stored conversations
    List,

    /// Show the turns of a conversation
    Show {
        /// Conversation id
        id: String,

        /// Only the last N turns
        #[arg(short = 'n', long)]
        last: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a conversation
    Clear {
        /// Conversation id
        id: String,
    },
}

impl HistoryCommand {
    /// Execute the history command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let log = JsonlConversationLog::new(&config.workspace);

        match &self.action {
            HistoryAction::List => {
                let ids = log.list_conversations().await?;
                if ids.is_empty() {
                    eprintln!("No conversations stored");
                }
                for id in ids {
                    println!("{}", id);
                }
            }
            HistoryAction::Show { id, last, json } => {
                let turns = match last {
                    Some(n) => log.recent(id, *n).await?,
                    None => log.turns(id).await?,
                };

                if *json {
                    println!("{}", serde_json::to_string_pretty(&turns)?);
                } else {
                    for turn in &turns {
                        println!("[{}]", turn.timestamp.format("%Y-%m-%d %H:%M:%S"));
                        println!("> {}", turn.message);
                        println!("{}", turn.response);
                        println!();
                    }
                }
            }
            HistoryAction::Clear { id } => {
                log.clear(id).await?;
                tracing::info!("Cleared conversation {}", id);
                println!("Conversation '{}' cleared", id);
            }
        }

        Ok(())
    }
}
