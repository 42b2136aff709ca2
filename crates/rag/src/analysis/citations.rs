//! Citation extraction from generated answers.

use crate::context::ChunkClassifier;
use crate::types::{Citation, RetrievedChunk};
use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Extracts citations from generated text.
///
/// Implementations must only cite filenames present in `chunks`.
pub trait CitationExtractor: Send + Sync {
    fn extract(&self, generated_text: &str, chunks: &[RetrievedChunk]) -> Vec<Citation>;
}

/// Cites a retrieved file when the answer carries a `[Source: <filename>]`
/// marker for it, or failing that mentions the bare filename.
///
/// Bare mentions only count outside markers and on name boundaries, so
/// `a.txt` is not cited by `data.txt`.
pub struct MarkerCitationExtractor {
    classifier: ChunkClassifier,
}

impl MarkerCitationExtractor {
    pub fn new(classifier: ChunkClassifier) -> Self {
        Self { classifier }
    }
}

impl CitationExtractor for MarkerCitationExtractor {
    fn extract(&self, generated_text: &str, chunks: &[RetrievedChunk]) -> Vec<Citation> {
        let markers = source_markers(generated_text);
        let prose = without_markers(generated_text).to_lowercase();

        let mut citations: Vec<Citation> = group_by_file(chunks)
            .into_iter()
            .filter(|(filename, _)| {
                let lower = filename.to_lowercase();
                let base = basename(&lower);
                markers.contains(&lower)
                    || markers.contains(base)
                    || mentions(&prose, &lower)
                    || mentions(&prose, base)
            })
            .map(|(filename, similarities)| Citation {
                kind: self.classifier.citation_type(filename),
                relevance: similarities.iter().sum::<f32>() / similarities.len() as f32,
                file: filename.to_string(),
            })
            .collect();

        citations.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        citations
    }
}

/// Distinct filenames with their chunk similarities, in first-seen order.
fn group_by_file(chunks: &[RetrievedChunk]) -> Vec<(&str, Vec<f32>)> {
    let mut groups: Vec<(&str, Vec<f32>)> = Vec::new();

    for chunk in chunks.iter().filter(|c| !c.filename.trim().is_empty()) {
        match groups.iter_mut().find(|(name, _)| *name == chunk.filename) {
            Some((_, sims)) => sims.push(chunk.similarity),
            None => groups.push((chunk.filename.as_str(), vec![chunk.similarity])),
        }
    }

    groups
}

fn marker_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\[\s*source\s*:\s*([^\]]+?)\s*\]").ok())
        .as_ref()
}

/// Lowercased names inside every `[Source: ...]` marker.
fn source_markers(text: &str) -> HashSet<String> {
    let Some(pattern) = marker_pattern() else {
        return HashSet::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| {
            // "[Source: a.txt, b.txt]" cites both
            m.as_str()
                .split(',')
                .map(|name| name.trim().to_lowercase())
                .collect::<Vec<_>>()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// The text with every marker blanked out.
fn without_markers(text: &str) -> String {
    match marker_pattern() {
        Some(pattern) => pattern.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    }
}

/// Whether `name` appears in `text` as a whole filename.
fn mentions(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    text.match_indices(name).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let mut after = text[start + name.len()..].chars();

        let starts_clean = !before.is_some_and(is_name_char);
        let ends_clean = match after.next() {
            None => true,
            // Sentence-ending period: "see a.txt."
            Some('.') => !after.next().is_some_and(is_name_char),
            Some(c) => !is_name_char(c),
        };

        starts_clean && ends_clean
    })
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '\\')
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
