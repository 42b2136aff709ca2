//! Prompt builder for rendering answer and analysis prompts.
//!
//! Sections always render in the same order: system context, conduct line,
//! conversation history (omitted when empty), retrieval context (or the
//! no-context notice), the question and finally the mode instructions.

use crate::loader::load_overrides;
use crate::types::{
    template_id, BuiltPrompt, BuiltPromptMetadata, PromptLimits, ANALYZE_TEMPLATE_ID,
    DETAILED_TEMPLATE_ID, FAST_TEMPLATE_ID,
};
use handlebars::Handlebars;
use ragstack_core::{AppError, AppResult, ConversationTurn, QueryMode};
use serde::Serialize;
use std::path::Path;

/// Marker returned by the context formatter when retrieval found nothing.
///
/// Never produced by real content; the builder swaps it for [`NO_CONTEXT_NOTICE`].
pub const NO_CONTEXT_SENTINEL: &str = "<<NO_RELEVANT_CONTEXT_FOUND>>";

/// Text rendered in place of the context block when retrieval found nothing.
pub const NO_CONTEXT_NOTICE: &str = "No relevant documents were found in the knowledge base for this question. Say so plainly and do not invent sources.";

const FAST_TEMPLATE: &str = r#"{{#if system_context}}
{{system_context}}
{{/if}}

You are a helpful assistant that answers questions using the user's indexed documents. Rely on the provided context, and cite every document you use as [Source: <filename>].
{{#if history}}

Conversation so far:
{{#each history}}
User: {{this.message}}
Assistant: {{this.response}}
{{/each}}
{{/if}}

{{#if has_context}}
Context:
{{context}}
{{else}}
{{no_context_notice}}
{{/if}}

Question: {{query}}

Answer concisely and directly from the context above. Cite the supporting document for each claim as [Source: <filename>].
"#;

const DETAILED_TEMPLATE: &str = r#"{{#if system_context}}
{{system_context}}
{{/if}}

You are a careful analyst that answers questions using the user's indexed documents. Rely on the provided context, and cite every document you use as [Source: <filename>].
{{#if history}}

Conversation so far:
{{#each history}}
User: {{this.message}}
Assistant: {{this.response}}
{{/each}}
{{/if}}

{{#if has_context}}
Context:
{{context}}
{{else}}
{{no_context_notice}}
{{/if}}

Question: {{query}}

Give a thorough answer. Explain your reasoning step by step, cite every supporting document as [Source: <filename>], point out where sources agree or conflict, and end with a line of the form "Confidence: N/10" stating how certain you are of the answer.
"#;

const ANALYZE_TEMPLATE: &str = r#"Analyze the following question before it is answered from a document collection.

Question: {{query}}

Reply with exactly three lines:
Intent: <one sentence describing what the user wants>
Key terms: <comma-separated search terms>
Complexity: <simple, moderate or complex>
"#;

#[derive(Serialize)]
struct HistoryEntry {
    message: String,
    response: String,
}

#[derive(Serialize)]
struct PromptVariables<'a> {
    system_context: String,
    history: Vec<HistoryEntry>,
    has_context: bool,
    context: String,
    no_context_notice: &'a str,
    query: String,
}

#[derive(Serialize)]
struct AnalysisVariables {
    query: String,
}

const SLOT_MARK: char = '\u{1}';

/// Caller-supplied values held out of the rendered layout.
///
/// Templates render with placeholders so blank-line cleanup only touches
/// template text; [`Slots::fill`] then splices the values back verbatim.
#[derive(Default)]
struct Slots {
    values: Vec<String>,
}

impl Slots {
    /// Placeholder for `value`; empty values stay empty so `{{#if}}` still works.
    fn hold(&mut self, value: &str) -> String {
        if value.is_empty() {
            return String::new();
        }
        let key = format!("{mark}{}{mark}", self.values.len(), mark = SLOT_MARK);
        self.values.push(value.to_string());
        key
    }

    fn fill(&self, text: &str) -> String {
        text.split(SLOT_MARK)
            .enumerate()
            .map(|(i, part)| {
                if i % 2 == 0 {
                    return part;
                }
                part.parse::<usize>()
                    .ok()
                    .and_then(|n| self.values.get(n))
                    .map(String::as_str)
                    .unwrap_or(part)
            })
            .collect()
    }
}

/// Renders answer and analysis prompts from registered templates.
pub struct PromptBuilder {
    registry: Handlebars<'static>,
    limits: PromptLimits,
}

impl PromptBuilder {
    /// Create a builder with the built-in templates.
    pub fn new(limits: PromptLimits) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Prompts are plain text
        registry.register_escape_fn(handlebars::no_escape);

        let mut builder = Self { registry, limits };
        builder.register(FAST_TEMPLATE_ID, FAST_TEMPLATE)?;
        builder.register(DETAILED_TEMPLATE_ID, DETAILED_TEMPLATE)?;
        builder.register(ANALYZE_TEMPLATE_ID, ANALYZE_TEMPLATE)?;

        Ok(builder)
    }

    /// Create a builder, then apply overrides from `.ragstack/prompts/`.
    pub fn from_workspace(workspace_path: &Path, limits: PromptLimits) -> AppResult<Self> {
        let mut builder = Self::new(limits)?;

        for definition in load_overrides(workspace_path)? {
            tracing::info!("Using prompt override: {}", definition.id);
            builder.register(&definition.id, &definition.template)?;
        }

        Ok(builder)
    }

    /// Register (or replace) a template.
    pub fn register(&mut self, id: &str, template: &str) -> AppResult<()> {
        self.registry
            .register_template_string(id, template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template {}: {}", id, e)))
    }

    pub fn limits(&self) -> &PromptLimits {
        &self.limits
    }

    /// Build the answer prompt for a query.
    ///
    /// `formatted_context` is the formatter output; passing
    /// [`NO_CONTEXT_SENTINEL`] renders the no-context notice instead of a
    /// context block.
    pub fn build(
        &self,
        query: &str,
        formatted_context: &str,
        history: &[ConversationTurn],
        system_context: &str,
        mode: QueryMode,
    ) -> AppResult<BuiltPrompt> {
        let id = template_id(mode);
        let mut slots = Slots::default();
        let history = self.recent_history(history, mode, &mut slots);
        let has_context =
            !formatted_context.trim().is_empty() && formatted_context != NO_CONTEXT_SENTINEL;

        tracing::debug!(
            template = id,
            history_turns = history.len(),
            has_context,
            "Building prompt"
        );

        let history_turns = history.len();
        let variables = PromptVariables {
            system_context: slots.hold(system_context.trim()),
            history,
            has_context,
            context: if has_context {
                slots.hold(formatted_context)
            } else {
                String::new()
            },
            no_context_notice: NO_CONTEXT_NOTICE,
            query: slots.hold(query.trim()),
        };

        let text = self.render(id, &variables, &slots)?;

        Ok(BuiltPrompt {
            text,
            metadata: BuiltPromptMetadata {
                template_id: id.to_string(),
                mode,
                history_turns,
                context_included: has_context,
            },
        })
    }

    /// Build the prompt for the detailed-mode query analysis call.
    pub fn build_analysis(&self, query: &str) -> AppResult<String> {
        let mut slots = Slots::default();
        let variables = AnalysisVariables {
            query: slots.hold(query.trim()),
        };
        self.render(ANALYZE_TEMPLATE_ID, &variables, &slots)
    }

    fn recent_history(
        &self,
        history: &[ConversationTurn],
        mode: QueryMode,
        slots: &mut Slots,
    ) -> Vec<HistoryEntry> {
        let keep = self.limits.history_turns(mode);
        let budget = self.limits.turn_char_budget;

        history[history.len().saturating_sub(keep)..]
            .iter()
            .map(|turn| HistoryEntry {
                message: slots.hold(&truncate_chars(&turn.message, budget)),
                response: slots.hold(&truncate_chars(&turn.response, budget)),
            })
            .collect()
    }

    fn render<T: Serialize>(&self, id: &str, data: &T, slots: &Slots) -> AppResult<String> {
        let rendered = self
            .registry
            .render(id, data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template {}: {}", id, e)))?;

        Ok(slots.fill(&collapse_blank_lines(&rendered)))
    }
}

/// Truncate to at most `max_chars` characters, appending "..." when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...", text[..byte_idx].trim_end()),
    }
}

/// Collapse runs of blank lines left behind by omitted sections.
///
/// Runs before slot values are spliced in, so it only sees template text.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = true;

    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push_str(line.trim_end());
        out.push('\n');
        previous_blank = blank;
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(PromptLimits::default()).unwrap()
    }

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| ConversationTurn::new(format!("question {}", i), format!("answer {}", i)))
            .collect()
    }

    #[test]
    fn test_sections_render_in_order() {
        let built = builder()
            .build(
                "What does the indexer do?",
                "[1] notes.txt (similarity: 0.91)\nThe indexer splits files.",
                &turns(1),
                "SYSTEM OVERVIEW: document assistant",
                QueryMode::Fast,
            )
            .unwrap();

        let text = &built.text;
        let system = text.find("SYSTEM OVERVIEW").unwrap();
        let conduct = text.find("You are a helpful assistant").unwrap();
        let history = text.find("Conversation so far").unwrap();
        let context = text.find("Context:").unwrap();
        let question = text.find("Question: What does the indexer do?").unwrap();
        let suffix = text.find("Answer concisely").unwrap();

        assert!(system < conduct);
        assert!(conduct < history);
        assert!(history < context);
        assert!(context < question);
        assert!(question < suffix);
        assert!(built.metadata.context_included);
        assert_eq!(built.metadata.template_id, "rag.fast");
    }

    #[test]
    fn test_empty_history_is_omitted() {
        let built = builder()
            .build("Q?", "some context", &[], "sys", QueryMode::Fast)
            .unwrap();

        assert!(!built.text.contains("Conversation so far"));
        assert_eq!(built.metadata.history_turns, 0);
    }

    #[test]
    fn test_sentinel_renders_notice() {
        let built = builder()
            .build("What is X?", NO_CONTEXT_SENTINEL, &[], "sys", QueryMode::Fast)
            .unwrap();

        assert!(built.text.contains(NO_CONTEXT_NOTICE));
        assert!(!built.text.contains(NO_CONTEXT_SENTINEL));
        assert!(!built.text.contains("Context:"));
        assert!(!built.metadata.context_included);
    }

    #[test]
    fn test_history_window_per_mode() {
        let history = turns(8);

        let fast = builder()
            .build("Q?", "ctx", &history, "sys", QueryMode::Fast)
            .unwrap();
        assert_eq!(fast.metadata.history_turns, 3);
        assert!(fast.text.contains("question 7"));
        assert!(fast.text.contains("question 5"));
        assert!(!fast.text.contains("question 4"));

        let detailed = builder()
            .build("Q?", "ctx", &history, "sys", QueryMode::Detailed)
            .unwrap();
        assert_eq!(detailed.metadata.history_turns, 5);
        assert!(detailed.text.contains("question 3"));
        assert!(!detailed.text.contains("question 2"));
    }

    #[test]
    fn test_history_turns_are_truncated() {
        let limits = PromptLimits {
            turn_char_budget: 10,
            ..Default::default()
        };
        let builder = PromptBuilder::new(limits).unwrap();
        let history = vec![ConversationTurn::new("a".repeat(50), "b".repeat(50))];

        let built = builder
            .build("Q?", "ctx", &history, "sys", QueryMode::Fast)
            .unwrap();
        assert!(built.text.contains(&format!("User: {}...", "a".repeat(10))));
        assert!(!built.text.contains(&"b".repeat(11)));
    }

    #[test]
    fn test_detailed_asks_for_confidence() {
        let built = builder()
            .build("Q?", "ctx", &[], "sys", QueryMode::Detailed)
            .unwrap();
        assert!(built.text.contains("Confidence: N/10"));
        assert!(built.text.contains("[Source: <filename>]"));
    }

    #[test]
    fn test_context_is_not_html_escaped() {
        let built = builder()
            .build("a < b?", "x & y <tag>", &[], "sys", QueryMode::Fast)
            .unwrap();
        assert!(built.text.contains("x & y <tag>"));
        assert!(built.text.contains("a < b?"));
    }

    #[test]
    fn test_override_replaces_template() {
        let mut builder = builder();
        builder
            .register(FAST_TEMPLATE_ID, "Q={{query}} C={{context}}")
            .unwrap();

        let built = builder
            .build("why", "because", &[], "sys", QueryMode::Fast)
            .unwrap();
        assert_eq!(built.text, "Q=why C=because");
    }

    #[test]
    fn test_build_analysis() {
        let text = builder().build_analysis("  How are chunks ranked?  ").unwrap();
        assert!(text.contains("Question: How are chunks ranked?"));
        assert!(text.contains("Complexity:"));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_chunk_and_history_text_kept_verbatim() {
        let context = "[1] poem.txt (similarity: 0.80)\nfirst stanza  \n\n\n\nsecond stanza";
        let history = vec![ConversationTurn::new("Show me\n\n\nthe table", "col a   \n\n\ncol b")];

        let built = builder()
            .build("Q?", context, &history, "sys", QueryMode::Fast)
            .unwrap();

        assert!(built.text.contains(context));
        assert!(built.text.contains("User: Show me\n\n\nthe table"));
        assert!(built.text.contains("Assistant: col a   \n\n\ncol b"));
        assert!(!built.text.contains(SLOT_MARK));
    }

    #[test]
    fn test_omitted_sections_leave_no_gaps() {
        let built = builder()
            .build("Q?", NO_CONTEXT_SENTINEL, &[], "", QueryMode::Fast)
            .unwrap();

        assert!(built.text.starts_with("You are a helpful assistant"));
        assert!(!built.text.contains("\n\n\n"));
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("\n\na\n\n\n\nb\n\n"), "a\n\nb");
    }
}
