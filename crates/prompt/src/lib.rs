//! Prompt system for ragstack.
//!
//! This crate provides:
//! - Built-in Handlebars templates for fast, detailed and analysis prompts
//! - YAML template overrides loaded from `.ragstack/prompts/`
//! - History windowing and truncation

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{truncate_chars, PromptBuilder, NO_CONTEXT_NOTICE, NO_CONTEXT_SENTINEL};
pub use loader::{list_prompts, load_overrides, load_prompt};
pub use types::{
    template_id, BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptLimits,
    ANALYZE_TEMPLATE_ID, DETAILED_TEMPLATE_ID, FAST_TEMPLATE_ID,
};
