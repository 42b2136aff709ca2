//! ragstack CLI
//!
//! Main entry point for the ragstack command-line tool.
//! Answers questions from indexed documents through the query orchestrator.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ContextCommand, HistoryCommand, StatusCommand};
use ragstack_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// ragstack - retrieval-augmented answers from your local documents
#[derive(Parser, Debug)]
#[command(name = "ragstack")]
#[command(about = "Retrieval-augmented answers from your local documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGSTACK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGSTACK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "RAGSTACK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question against the indexed documents
    Ask(AskCommand),

    /// Print the derived system context
    Context(ContextCommand),

    /// Inspect stored conversations
    History(HistoryCommand),

    /// Check the search service and generation backend
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration from file and environment
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    config.validate()?;

    // Log startup
    tracing::info!("ragstack CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Model: {}", config.model);

    // Ensure .ragstack directory exists
    config.ensure_ragstack_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Context(_) => "context",
        Commands::History(_) => "history",
        Commands::Status(_) => "status",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Context(cmd) => cmd.execute(&config).await,
        Commands::History(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
