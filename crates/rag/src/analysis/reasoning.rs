//! Descriptive reasoning summary for detailed-mode results.

use crate::context::quality_label;
use crate::types::{
    average_similarity, QueryAnalysis, RetrievedChunk, Stage, StageName, SYSTEM_TAG,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

const HIGH_QUALITY_SIMILARITY: f32 = 0.6;

/// Build the six-stage reasoning summary.
///
/// Metrics describe the retrieval result; they are attached to the answer
/// for display and never feed back into processing.
pub fn reasoning_chain(
    chunks: &[RetrievedChunk],
    analysis: &QueryAnalysis,
    min_similarity: f32,
) -> Vec<Stage> {
    let avg = round3(average_similarity(chunks));
    let max = round3(chunks.iter().map(|c| c.similarity).fold(0.0, f32::max));
    let sources: BTreeSet<&str> = chunks.iter().map(|c| c.filename.as_str()).collect();
    let system_chunks = chunks.iter().filter(|c| c.has_tag(SYSTEM_TAG)).count();
    let high_quality: Vec<&RetrievedChunk> = chunks
        .iter()
        .filter(|c| c.similarity >= HIGH_QUALITY_SIMILARITY)
        .collect();
    let corroborating: BTreeSet<&str> = high_quality.iter().map(|c| c.filename.as_str()).collect();

    let mut distribution: BTreeMap<&str, usize> = BTreeMap::new();
    for chunk in chunks {
        *distribution
            .entry(quality_label(chunk.similarity, min_similarity))
            .or_insert(0) += 1;
    }

    let covered_terms = analysis
        .key_terms
        .iter()
        .filter(|term| {
            chunks
                .iter()
                .any(|c| c.text.to_lowercase().contains(term.as_str()))
        })
        .count();

    vec![
        stage(
            StageName::Decomposition,
            "Broke the question into intent and search terms",
            [
                ("intent", json!(analysis.intent)),
                ("key_terms", json!(analysis.key_terms)),
                ("complexity", json!(analysis.complexity.as_str())),
            ],
        ),
        stage(
            StageName::EvidenceGathering,
            "Retrieved candidate passages from the document index",
            [
                ("chunks_retrieved", json!(chunks.len())),
                ("unique_sources", json!(sources.len())),
                ("avg_similarity", json!(avg)),
                ("max_similarity", json!(max)),
            ],
        ),
        stage(
            StageName::PatternIdentification,
            "Grouped passages by origin and match quality",
            [
                ("system_chunks", json!(system_chunks)),
                ("user_chunks", json!(chunks.len() - system_chunks)),
                ("quality_distribution", json!(distribution)),
            ],
        ),
        stage(
            StageName::HypothesisFormation,
            "Selected the strongest passages to ground the answer",
            [
                ("high_quality_chunks", json!(high_quality.len())),
                ("key_terms_covered", json!(covered_terms)),
                ("key_terms_total", json!(analysis.key_terms.len())),
            ],
        ),
        stage(
            StageName::Verification,
            "Checked how many sources support the answer",
            [
                ("corroborating_sources", json!(corroborating.len())),
                (
                    "low_quality_chunks",
                    json!(chunks.len() - high_quality.len()),
                ),
            ],
        ),
        stage(
            StageName::Synthesis,
            "Combined the evidence into a cited answer",
            [
                ("evidence_strength", json!(evidence_strength(chunks.len(), avg))),
                ("sources_available", json!(sources.len())),
            ],
        ),
    ]
}

fn stage<const N: usize>(
    name: StageName,
    description: &str,
    metrics: [(&str, Value); N],
) -> Stage {
    Stage {
        name,
        description: description.to_string(),
        metrics: metrics
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    }
}

fn evidence_strength(count: usize, avg: f32) -> &'static str {
    if count == 0 {
        "none"
    } else if avg >= 0.7 && count >= 3 {
        "strong"
    } else if avg >= 0.5 {
        "moderate"
    } else {
        "weak"
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
