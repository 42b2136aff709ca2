//! Core types for query orchestration.

use ragstack_core::{ConversationTurn, QueryMode};
use ragstack_llm::SamplingParams;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tag carried by chunks whose filename matches a system keyword.
pub const SYSTEM_TAG: &str = "system";

/// Tag carried by every other chunk.
pub const USER_TAG: &str = "user";

/// Confidence reported when retrieval returned nothing.
pub const EMPTY_RETRIEVAL_CONFIDENCE: f32 = 3.0;

/// Confidence reported by error results.
pub const ERROR_CONFIDENCE: f32 = 1.0;

pub const MIN_CONFIDENCE: f32 = 1.0;
pub const MAX_CONFIDENCE: f32 = 10.0;

/// A chunk returned by the vector search service for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Source document name
    pub filename: String,

    /// Chunk text
    pub text: String,

    /// Similarity to the query, normalized to [0, 1]
    pub similarity: f32,

    /// Position of the chunk within its document
    pub chunk_index: u32,

    /// Classification tags (`system` or `user`)
    #[serde(default)]
    pub source_tags: BTreeSet<String>,
}

impl RetrievedChunk {
    /// Create an untagged chunk.
    pub fn new(
        filename: impl Into<String>,
        text: impl Into<String>,
        similarity: f32,
        chunk_index: u32,
    ) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
            similarity,
            chunk_index,
            source_tags: BTreeSet::new(),
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.source_tags.insert(tag.to_string());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.source_tags.contains(tag)
    }
}

/// Mean similarity of a chunk set (0 when empty).
pub fn average_similarity(chunks: &[RetrievedChunk]) -> f32 {
    if chunks.is_empty() {
        return 0.0;
    }
    chunks.iter().map(|c| c.similarity).sum::<f32>() / chunks.len() as f32
}

/// Whether a cited document is part of the system configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationType {
    System,
    User,
}

/// A reference from the generated answer back to a retrieved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Filename of the cited document
    pub file: String,

    /// System or user document
    #[serde(rename = "type")]
    pub kind: CitationType,

    /// Mean similarity of the document's retrieved chunks
    pub relevance: f32,
}

/// How a query was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    Fast,
    Detailed,
    Error,
}

impl From<QueryMode> for ProcessingMode {
    fn from(mode: QueryMode) -> Self {
        match mode {
            QueryMode::Fast => Self::Fast,
            QueryMode::Detailed => Self::Detailed,
        }
    }
}

/// Named stages of the detailed-mode reasoning summary, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Decomposition,
    EvidenceGathering,
    PatternIdentification,
    HypothesisFormation,
    Verification,
    Synthesis,
}

/// One stage of the reasoning summary.
///
/// Stages are descriptive only; nothing reads them back to steer processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: StageName,
    pub description: String,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

/// Coarse complexity of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

/// Where a query analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    /// Parsed from the low-temperature analysis generation
    Model,
    /// Derived locally because the analysis call failed or was unusable
    Local,
}

/// Summary of a question's intent, produced before detailed retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: String,
    pub key_terms: Vec<String>,
    pub complexity: Complexity,
    pub source: AnalysisSource,
}

/// A query as handed over by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Generation model to use
    pub model: String,

    /// The user's question
    pub user_message: String,

    /// Sampling parameters passed through to generation
    #[serde(default)]
    pub sampling: SamplingParams,

    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<ConversationTurn>,

    /// Fast (true) or detailed (false) processing
    #[serde(default = "default_fast_mode")]
    pub fast_mode: bool,

    /// Conversation the query belongs to, for logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

fn default_fast_mode() -> bool {
    true
}

impl QueryRequest {
    /// Create a fast-mode request with default sampling and no history.
    pub fn new(model: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            user_message: user_message.into(),
            sampling: SamplingParams::default(),
            history: Vec::new(),
            fast_mode: true,
            conversation_id: None,
        }
    }

    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn mode(&self) -> QueryMode {
        QueryMode::from_fast_flag(self.fast_mode)
    }
}

/// Timing and provenance details attached to every result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Wall time for the whole query
    pub processing_time_ms: u64,

    /// Wall time spent in the vector search call
    pub search_time_ms: u64,

    /// Mean similarity of the retrieved chunks
    pub avg_similarity: f32,

    /// Chunk count requested from the search service
    pub top_k: usize,

    /// Generation model
    pub model: String,

    /// Whether a system context block was part of the prompt
    pub system_context_included: bool,

    /// Detailed-mode query analysis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<QueryAnalysis>,
}

/// The structured answer returned to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub response_text: String,
    pub citations: Vec<Citation>,
    pub confidence: f32,
    pub chunks_used: usize,
    pub processing_mode: ProcessingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_chain: Option<Vec<Stage>>,
    pub metadata: QueryMetadata,
}

impl QueryResult {
    /// Build an error result carrying a readable message.
    pub fn error(message: impl Into<String>, metadata: QueryMetadata) -> Self {
        Self {
            response_text: message.into(),
            citations: Vec::new(),
            confidence: ERROR_CONFIDENCE,
            chunks_used: 0,
            processing_mode: ProcessingMode::Error,
            reasoning_chain: None,
            metadata,
        }
    }

    pub fn is_error(&self) -> bool {
        self.processing_mode == ProcessingMode::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_similarity() {
        let chunks = vec![
            RetrievedChunk::new("a.txt", "a", 0.9, 0),
            RetrievedChunk::new("b.txt", "b", 0.5, 0),
        ];
        assert!((average_similarity(&chunks) - 0.7).abs() < 1e-6);
        assert_eq!(average_similarity(&[]), 0.0);
    }

    #[test]
    fn test_error_result_shape() {
        let result = QueryResult::error("backend down", QueryMetadata::default());
        assert!(result.is_error());
        assert_eq!(result.confidence, 1.0);
        assert!(result.citations.is_empty());
        assert_eq!(result.chunks_used, 0);
    }

    #[test]
    fn test_result_serialization() {
        let result = QueryResult {
            response_text: "Paris".to_string(),
            citations: vec![Citation {
                file: "a.txt".to_string(),
                kind: CitationType::User,
                relevance: 0.9,
            }],
            confidence: 7.5,
            chunks_used: 1,
            processing_mode: ProcessingMode::Fast,
            reasoning_chain: None,
            metadata: QueryMetadata::default(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["processing_mode"], "fast");
        assert_eq!(json["citations"][0]["type"], "user");
        assert!(json.get("reasoning_chain").is_none());
    }

    #[test]
    fn test_stage_names_snake_case() {
        let json = serde_json::to_string(&StageName::EvidenceGathering).unwrap();
        assert_eq!(json, "\"evidence_gathering\"");
    }

    #[test]
    fn test_request_mode() {
        let request = QueryRequest::new("llama3.2", "What is X?").with_fast_mode(false);
        assert_eq!(request.mode(), QueryMode::Detailed);
    }
}
