//! Ask command handler.
//!
//! Runs one question through the query orchestrator, optionally inside a
//! stored conversation.

use super::build_orchestrator;
use clap::Args;
use ragstack_core::{config::AppConfig, AppError, AppResult};
use ragstack_llm::SamplingParams;
use ragstack_rag::{JsonlConversationLog, QueryRequest, QueryResult};
use std::path::PathBuf;

/// Ask a question against the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub prompt: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "prompt")]
    pub file: Option<PathBuf>,

    /// Use detailed mode (query analysis, wider retrieval, reasoning summary)
    #[arg(short, long)]
    pub detailed: bool,

    /// Continue a stored conversation
    #[arg(long)]
    pub conversation: Option<String>,

    /// Start a new stored conversation with a generated id
    #[arg(long, conflicts_with = "conversation")]
    pub new_conversation: bool,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold (0.0-1.0)
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Top-k sampling (1-100)
    #[arg(long)]
    pub top_k: Option<i64>,

    /// Repetition penalty (0.5-2.0)
    #[arg(long)]
    pub repeat_penalty: Option<f32>,

    /// RNG seed for reproducible answers
    #[arg(long)]
    pub seed: Option<i64>,

    /// Maximum tokens in response
    #[arg(long)]
    pub max_tokens: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.get_prompt()?;
        let orchestrator = build_orchestrator(config)?;

        let request = QueryRequest::new(&config.model, question)
            .with_fast_mode(!self.detailed)
            .with_sampling(self.sampling());

        let conversation_id = if self.new_conversation {
            Some(uuid::Uuid::new_v4().to_string())
        } else {
            self.conversation.clone()
        };

        let result = match &conversation_id {
            Some(id) => {
                let log = JsonlConversationLog::new(&config.workspace);
                orchestrator
                    .process_conversation_query(&log, id, request)
                    .await?
            }
            None => orchestrator.process_query(&request).await,
        };

        if self.json {
            let mut output = serde_json::to_value(&result)?;
            if let (Some(id), Some(obj)) = (&conversation_id, output.as_object_mut()) {
                obj.insert("conversation_id".to_string(), id.clone().into());
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_result(&result);
            if self.new_conversation {
                if let Some(id) = &conversation_id {
                    eprintln!("Conversation: {}", id);
                }
            }
        }

        if result.is_error() {
            return Err(AppError::Generation(result.response_text));
        }

        Ok(())
    }

    /// Get the question text from the argument or a file.
    fn get_prompt(&self) -> AppResult<String> {
        if let Some(prompt) = &self.prompt {
            return Ok(prompt.clone());
        }

        if let Some(path) = &self.file {
            return std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read prompt file {:?}: {}", path, e))
            });
        }

        Err(AppError::Config("No question provided".to_string()))
    }

    fn sampling(&self) -> SamplingParams {
        let mut sampling = SamplingParams::default();

        if let Some(temperature) = self.temperature {
            sampling.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            sampling.top_p = top_p;
        }
        if let Some(top_k) = self.top_k {
            sampling.top_k = top_k;
        }
        if let Some(repeat_penalty) = self.repeat_penalty {
            sampling.repeat_penalty = repeat_penalty;
        }
        if let Some(seed) = self.seed {
            sampling.seed = seed;
        }
        if let Some(max_tokens) = self.max_tokens {
            sampling.num_predict = max_tokens;
        }

        sampling
    }
}

/// Answer on stdout, provenance on stderr.
fn print_result(result: &QueryResult) {
    println!("{}", result.response_text);

    if result.is_error() {
        return;
    }

    if !result.citations.is_empty() {
        eprintln!();
        eprintln!("Sources:");
        for citation in &result.citations {
            eprintln!(
                "  - {} ({:?}, relevance {:.2})",
                citation.file, citation.kind, citation.relevance
            );
        }
    }

    eprintln!(
        "Confidence: {:.1}/10 | chunks: {} | {}ms",
        result.confidence, result.chunks_used, result.metadata.processing_time_ms
    );

    if let Some(stages) = &result.reasoning_chain {
        if tracing::enabled!(tracing::Level::DEBUG) {
            for stage in stages {
                tracing::debug!(stage = ?stage.name, metrics = ?stage.metrics, "{}", stage.description);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        ask: AskCommand,
    }

    #[test]
    fn test_sampling_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "ask",
            "What is X?",
            "--temperature",
            "0.2",
            "--seed",
            "42",
            "--max-tokens",
            "256",
        ]);

        let sampling = cli.ask.sampling();
        assert_eq!(sampling.temperature, 0.2);
        assert_eq!(sampling.seed, 42);
        assert_eq!(sampling.num_predict, 256);
        assert_eq!(sampling.top_k, 40);
    }

    #[test]
    fn test_prompt_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "What is in the file?").unwrap();

        let cli = TestCli::parse_from(["ask", "--file", temp.path().to_str().unwrap()]);
        assert_eq!(cli.ask.get_prompt().unwrap(), "What is in the file?");
    }

    #[test]
    fn test_missing_prompt() {
        let cli = TestCli::parse_from(["ask"]);
        assert!(cli.ask.get_prompt().is_err());
    }
}
