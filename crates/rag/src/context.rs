//! Chunk classification and prompt context formatting.
//!
//! Retrieved chunks are split into system configuration and user documents.
//! The system group is always rendered first, whatever the similarity order.

use crate::types::{CitationType, RetrievedChunk, SYSTEM_TAG, USER_TAG};
use ragstack_core::QueryMode;
use ragstack_prompt::NO_CONTEXT_SENTINEL;

pub const SYSTEM_HEADER: &str = "=== SYSTEM CONFIGURATION ===";
pub const USER_HEADER: &str = "=== USER DOCUMENTS ===";

/// Classifies chunks as system or user material by filename keyword.
#[derive(Debug, Clone)]
pub struct ChunkClassifier {
    keywords: Vec<String>,
}

impl ChunkClassifier {
    /// Create a classifier; keywords are matched case-insensitively.
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Whether a filename contains any system keyword.
    pub fn is_system_file(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Whether a chunk is system material, by tag or by filename.
    pub fn is_system(&self, chunk: &RetrievedChunk) -> bool {
        chunk.has_tag(SYSTEM_TAG) || self.is_system_file(&chunk.filename)
    }

    pub fn citation_type(&self, filename: &str) -> CitationType {
        if self.is_system_file(filename) {
            CitationType::System
        } else {
            CitationType::User
        }
    }

    /// Attach the `system` or `user` tag.
    pub fn tag(&self, chunk: RetrievedChunk) -> RetrievedChunk {
        if self.is_system_file(&chunk.filename) {
            chunk.with_tag(SYSTEM_TAG)
        } else {
            chunk.with_tag(USER_TAG)
        }
    }

    /// Split chunks into (system, user), keeping the received order in each group.
    pub fn partition<'a>(
        &self,
        chunks: &'a [RetrievedChunk],
    ) -> (Vec<&'a RetrievedChunk>, Vec<&'a RetrievedChunk>) {
        chunks.iter().partition(|c| self.is_system(c))
    }
}

/// Quality bucket for a similarity score.
pub fn quality_label(similarity: f32, min_similarity: f32) -> &'static str {
    if similarity >= 0.8 {
        "excellent"
    } else if similarity >= 0.6 {
        "high"
    } else if similarity >= 0.4 {
        "good"
    } else if similarity >= min_similarity {
        "fair"
    } else {
        "low"
    }
}

/// Renders retrieved chunks into prompt-ready text.
#[derive(Debug, Clone)]
pub struct ContextFormatter {
    classifier: ChunkClassifier,
    min_similarity: f32,
}

impl ContextFormatter {
    pub fn new(classifier: ChunkClassifier, min_similarity: f32) -> Self {
        Self {
            classifier,
            min_similarity,
        }
    }

    /// Format chunks for a prompt.
    ///
    /// Returns [`NO_CONTEXT_SENTINEL`] when `chunks` is empty.
    pub fn format(&self, chunks: &[RetrievedChunk], mode: QueryMode) -> String {
        if chunks.is_empty() {
            return NO_CONTEXT_SENTINEL.to_string();
        }

        let (system, user) = self.classifier.partition(chunks);
        let mut sections = Vec::new();

        if !system.is_empty() {
            sections.push(self.render_group(SYSTEM_HEADER, "S", &system, mode));
        }

        if !user.is_empty() {
            sections.push(self.render_group(USER_HEADER, "", &user, mode));
        }

        sections.join("\n\n")
    }

    fn render_group(
        &self,
        header: &str,
        prefix: &str,
        chunks: &[&RetrievedChunk],
        mode: QueryMode,
    ) -> String {
        let mut out = String::from(header);

        for (i, chunk) in chunks.iter().enumerate() {
            let details = match mode {
                QueryMode::Fast => format!("similarity: {:.2}", chunk.similarity),
                QueryMode::Detailed => format!(
                    "similarity: {:.2}, quality: {}",
                    chunk.similarity,
                    quality_label(chunk.similarity, self.min_similarity)
                ),
            };

            out.push_str(&format!(
                "\n\n[{}{}] {} ({})\n{}",
                prefix,
                i + 1,
                chunk.filename,
                details,
                chunk.text.trim()
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ChunkClassifier {
        ChunkClassifier::new(&[
            "system".to_string(),
            "admin".to_string(),
            "config".to_string(),
        ])
    }

    fn formatter() -> ContextFormatter {
        ContextFormatter::new(classifier(), 0.3)
    }

    #[test]
    fn test_classifier_matches_case_insensitively() {
        let c = classifier();
        assert!(c.is_system_file("config.json"));
        assert!(c.is_system_file("docs/SYSTEM_OVERVIEW.md"));
        assert!(c.is_system_file("Admin-guide.txt"));
        assert!(!c.is_system_file("notes.txt"));
        assert_eq!(c.citation_type("app.config"), CitationType::System);
        assert_eq!(c.citation_type("notes.txt"), CitationType::User);
    }

    #[test]
    fn test_tagging() {
        let c = classifier();
        let tagged = c.tag(RetrievedChunk::new("config.json", "x", 0.5, 0));
        assert!(tagged.has_tag(SYSTEM_TAG));
        let tagged = c.tag(RetrievedChunk::new("notes.txt", "x", 0.5, 0));
        assert!(tagged.has_tag(USER_TAG));
    }

    #[test]
    fn test_empty_returns_sentinel() {
        assert_eq!(formatter().format(&[], QueryMode::Fast), NO_CONTEXT_SENTINEL);
        assert_eq!(
            formatter().format(&[], QueryMode::Detailed),
            NO_CONTEXT_SENTINEL
        );
    }

    #[test]
    fn test_system_chunks_render_first() {
        let chunks = vec![
            RetrievedChunk::new("notes.txt", "User notes.", 0.95, 0),
            RetrievedChunk::new("config.json", "{\"port\": 8080}", 0.5, 0),
        ];

        for mode in [QueryMode::Fast, QueryMode::Detailed] {
            let text = formatter().format(&chunks, mode);
            let config_pos = text.find("config.json").unwrap();
            let notes_pos = text.find("notes.txt").unwrap();
            assert!(config_pos < notes_pos);
            assert!(text.find(SYSTEM_HEADER).unwrap() < text.find(USER_HEADER).unwrap());
        }
    }

    #[test]
    fn test_order_within_group_is_preserved() {
        let chunks = vec![
            RetrievedChunk::new("b.txt", "second", 0.4, 0),
            RetrievedChunk::new("a.txt", "first", 0.9, 0),
        ];
        let text = formatter().format(&chunks, QueryMode::Fast);
        assert!(text.find("b.txt").unwrap() < text.find("a.txt").unwrap());
        assert!(!text.contains(SYSTEM_HEADER));
    }

    #[test]
    fn test_detailed_includes_quality_labels() {
        let chunks = vec![
            RetrievedChunk::new("a.txt", "a", 0.85, 0),
            RetrievedChunk::new("b.txt", "b", 0.35, 1),
        ];

        let detailed = formatter().format(&chunks, QueryMode::Detailed);
        assert!(detailed.contains("[1] a.txt (similarity: 0.85, quality: excellent)"));
        assert!(detailed.contains("[2] b.txt (similarity: 0.35, quality: fair)"));

        let fast = formatter().format(&chunks, QueryMode::Fast);
        assert!(fast.contains("[1] a.txt (similarity: 0.85)"));
        assert!(!fast.contains("quality"));
    }

    #[test]
    fn test_quality_buckets() {
        assert_eq!(quality_label(0.8, 0.3), "excellent");
        assert_eq!(quality_label(0.7, 0.3), "high");
        assert_eq!(quality_label(0.45, 0.3), "good");
        assert_eq!(quality_label(0.3, 0.3), "fair");
        assert_eq!(quality_label(0.1, 0.3), "low");
    }
}
