//! Query orchestration for a local retrieval-augmented generation stack.
//!
//! Retrieves chunks from an external vector search service, renders them
//! into a prompt next to a cached description of the application, asks a
//! generative backend for an answer and scores the answer with citations
//! and a confidence estimate.

pub mod analysis;
pub mod config;
pub mod context;
pub mod history;
pub mod orchestrator;
pub mod retrieval;
pub mod system_context;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::{load_config, OrchestratorConfig};
pub use history::{ConversationLog, InMemoryConversationLog, JsonlConversationLog};
pub use orchestrator::QueryOrchestrator;
pub use retrieval::{HttpSearchClient, SearchService};
pub use types::{
    Citation, CitationType, ProcessingMode, QueryAnalysis, QueryMetadata, QueryRequest,
    QueryResult, RetrievedChunk, Stage, StageName,
};
