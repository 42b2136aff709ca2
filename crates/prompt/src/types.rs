//! Prompt types for ragstack.
//!
//! This module defines the domain entities for the prompt system.

use ragstack_core::QueryMode;
use serde::{Deserialize, Serialize};

/// Template id used for fast-mode answers.
pub const FAST_TEMPLATE_ID: &str = "rag.fast";

/// Template id used for detailed-mode answers.
pub const DETAILED_TEMPLATE_ID: &str = "rag.detailed";

/// Template id used for the detailed-mode query analysis call.
pub const ANALYZE_TEMPLATE_ID: &str = "rag.analyze";

/// Template id answering a query in the given mode.
pub fn template_id(mode: QueryMode) -> &'static str {
    match mode {
        QueryMode::Fast => FAST_TEMPLATE_ID,
        QueryMode::Detailed => DETAILED_TEMPLATE_ID,
    }
}

/// A prompt template override loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Template identifier (`rag.fast`, `rag.detailed` or `rag.analyze`)
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Free-form notes about what the override changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// Bounds applied to conversation history before it enters a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLimits {
    /// Most recent turns kept in fast mode
    #[serde(rename = "fastHistoryTurns", default = "default_fast_turns")]
    pub fast_history_turns: usize,

    /// Most recent turns kept in detailed mode
    #[serde(rename = "detailedHistoryTurns", default = "default_detailed_turns")]
    pub detailed_history_turns: usize,

    /// Character budget for each side of a turn
    #[serde(rename = "turnCharBudget", default = "default_turn_budget")]
    pub turn_char_budget: usize,
}

fn default_fast_turns() -> usize {
    3
}

fn default_detailed_turns() -> usize {
    5
}

fn default_turn_budget() -> usize {
    400
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            fast_history_turns: default_fast_turns(),
            detailed_history_turns: default_detailed_turns(),
            turn_char_budget: default_turn_budget(),
        }
    }
}

impl PromptLimits {
    /// Number of history turns kept for a mode.
    pub fn history_turns(&self, mode: QueryMode) -> usize {
        match mode {
            QueryMode::Fast => self.fast_history_turns,
            QueryMode::Detailed => self.detailed_history_turns,
        }
    }
}

/// A fully built prompt ready for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Template that produced the prompt
    #[serde(rename = "templateId")]
    pub template_id: String,

    /// Mode the prompt was built for
    pub mode: QueryMode,

    /// History turns included after truncation
    #[serde(rename = "historyTurns")]
    pub history_turns: usize,

    /// Whether retrieval context was rendered (false when nothing was found)
    #[serde(rename = "contextIncluded")]
    pub context_included: bool,
}
