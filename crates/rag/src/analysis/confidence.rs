//! Confidence estimation.
//!
//! A weighted heuristic over the retrieval result, optionally blended with
//! the model's own stated certainty in detailed mode.

use crate::types::{
    average_similarity, RetrievedChunk, EMPTY_RETRIEVAL_CONFIDENCE, MAX_CONFIDENCE, MIN_CONFIDENCE,
};
use ragstack_core::QueryMode;
use regex_lite::Regex;
use std::sync::OnceLock;

const FAST_BASE: f32 = 5.0;
const DETAILED_BASE: f32 = 6.0;

/// Similarity at or above which a chunk counts as high quality.
const HIGH_QUALITY_SIMILARITY: f32 = 0.6;

/// Self-assessment used when the answer carries no usable signal.
pub const DEFAULT_SELF_ASSESSMENT: f32 = 7.0;
const CONFIDENT_SELF_ASSESSMENT: f32 = 8.5;
const HESITANT_SELF_ASSESSMENT: f32 = 4.0;

const HESITANT_WORDS: &[&str] = &["uncertain", "might", "not sure", "unclear", "possibly"];
const CONFIDENT_WORDS: &[&str] = &["certain", "definitely", "clearly", "confident"];

/// Estimates answer confidence on a 1-10 scale.
pub trait ConfidenceEstimator: Send + Sync {
    /// Estimate from the retrieval result and the question.
    fn estimate(&self, chunks: &[RetrievedChunk], query: &str, mode: QueryMode) -> f32;

    /// Read the model's own certainty out of its answer.
    fn self_assessment(&self, generated_text: &str) -> f32 {
        parse_self_assessment(generated_text)
    }
}

/// The weighted step-function heuristic.
#[derive(Debug, Clone)]
pub struct HeuristicConfidence {
    min_similarity: f32,
}

impl HeuristicConfidence {
    pub fn new(min_similarity: f32) -> Self {
        Self { min_similarity }
    }

    fn similarity_bonus(&self, avg: f32) -> f32 {
        if avg >= 0.8 {
            2.5
        } else if avg >= 0.6 {
            2.0
        } else if avg >= 0.4 {
            1.0
        } else if avg >= self.min_similarity {
            0.5
        } else {
            0.0
        }
    }
}

fn count_bonus(n: usize) -> f32 {
    if n >= 5 {
        1.0
    } else if n >= 3 {
        0.5
    } else {
        0.0
    }
}

fn complexity_penalty(query: &str) -> f32 {
    let words = query.split_whitespace().count();
    if words > 20 {
        -1.0
    } else if words > 15 {
        -0.5
    } else {
        0.0
    }
}

fn quality_bonus(chunks: &[RetrievedChunk]) -> f32 {
    let high = chunks
        .iter()
        .filter(|c| c.similarity >= HIGH_QUALITY_SIMILARITY)
        .count();
    high as f32 / chunks.len() as f32
}

pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    } else {
        MIN_CONFIDENCE
    }
}

impl ConfidenceEstimator for HeuristicConfidence {
    fn estimate(&self, chunks: &[RetrievedChunk], query: &str, mode: QueryMode) -> f32 {
        if chunks.is_empty() {
            return EMPTY_RETRIEVAL_CONFIDENCE;
        }

        let base = match mode {
            QueryMode::Fast => FAST_BASE,
            QueryMode::Detailed => DETAILED_BASE,
        };

        let mut score = base
            + self.similarity_bonus(average_similarity(chunks))
            + count_bonus(chunks.len())
            + complexity_penalty(query);

        if mode == QueryMode::Detailed {
            score += quality_bonus(chunks);
        }

        clamp_confidence(score)
    }
}

/// Final confidence for a successful answer.
///
/// Empty retrieval always yields exactly 3. Detailed mode averages the
/// heuristic with the model's self-assessment.
pub fn answer_confidence(
    estimator: &dyn ConfidenceEstimator,
    chunks: &[RetrievedChunk],
    query: &str,
    mode: QueryMode,
    generated_text: &str,
) -> f32 {
    if chunks.is_empty() {
        return EMPTY_RETRIEVAL_CONFIDENCE;
    }

    let heuristic = estimator.estimate(chunks, query, mode);
    match mode {
        QueryMode::Fast => clamp_confidence(heuristic),
        QueryMode::Detailed => {
            let stated = estimator.self_assessment(generated_text);
            clamp_confidence((heuristic + stated) / 2.0)
        }
    }
}

/// Parse the model's stated certainty.
///
/// Prefers the last explicit `Confidence: N/10` statement, then the last
/// number stated right after "confidence" or "certainty" (0-10, "/10" or a
/// percentage), then hedging or assertive wording, then falls back to
/// [`DEFAULT_SELF_ASSESSMENT`].
pub fn parse_self_assessment(text: &str) -> f32 {
    if let Some(value) = stated_number(text) {
        return clamp_confidence(value);
    }

    let lower = text.to_lowercase();
    // "uncertain" contains "certain", so hedging wins ties
    if HESITANT_WORDS.iter().any(|w| lower.contains(w)) {
        HESITANT_SELF_ASSESSMENT
    } else if CONFIDENT_WORDS.iter().any(|w| lower.contains(w)) {
        CONFIDENT_SELF_ASSESSMENT
    } else {
        DEFAULT_SELF_ASSESSMENT
    }
}

fn stated_number(text: &str) -> Option<f32> {
    static EXPLICIT: OnceLock<Option<Regex>> = OnceLock::new();
    static AFTER: OnceLock<Option<Regex>> = OnceLock::new();
    static BEFORE: OnceLock<Option<Regex>> = OnceLock::new();

    // "Confidence: 9/10", the line the detailed template asks for
    let explicit = EXPLICIT
        .get_or_init(|| {
            Regex::new(r"(?i)(?:confidence|certainty)\s*:\s*(\d{1,3}(?:\.\d+)?)\s*(/\s*10|out of 10)")
                .ok()
        })
        .as_ref()?;
    // "confidence level is 85%", number directly after the keyword
    let after = AFTER
        .get_or_init(|| {
            Regex::new(
                r"(?i)(?:confidence|certainty)(?:\s+level)?(?:\s*:|\s+is)?\s*(\d{1,3}(?:\.\d+)?)\s*(%|/\s*10|out of 10)?",
            )
            .ok()
        })
        .as_ref()?;
    let before = BEFORE
        .get_or_init(|| {
            Regex::new(r"(?i)(\d{1,3}(?:\.\d+)?)\s*(%|/\s*10)\s*(?:confiden|certain)").ok()
        })
        .as_ref()?;

    // The closing statement wins over earlier mentions
    [explicit, after, before].into_iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let value: f32 = caps.get(1)?.as_str().parse().ok()?;
                let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                to_ten_scale(value, unit)
            })
            .last()
    })
}

fn to_ten_scale(value: f32, unit: &str) -> Option<f32> {
    if unit == "%" {
        return (value <= 100.0).then_some(value / 10.0);
    }
    if !unit.is_empty() {
        return (value <= 10.0).then_some(value);
    }
    if value <= 10.0 {
        Some(value)
    } else if value <= 100.0 {
        Some(value / 10.0)
    } else {
        None
    }
}
