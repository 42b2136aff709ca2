//! Query analysis used before detailed retrieval.

use crate::types::{AnalysisSource, Complexity, QueryAnalysis};

const MAX_KEY_TERMS: usize = 8;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "why", "when", "where", "who", "does",
    "do", "can", "could", "would", "should", "about", "there", "into", "your", "you", "me",
];

/// Parse the analysis call's three-line reply.
///
/// Missing fields are filled from [`local_analysis`]. Returns `None` when
/// the reply carries none of the expected fields.
pub fn parse_analysis(reply: &str, query: &str) -> Option<QueryAnalysis> {
    let mut intent = None;
    let mut key_terms = None;
    let mut complexity = None;

    for line in reply.lines() {
        let line = line.trim().trim_start_matches(['-', '*']).trim();
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match label.trim().to_lowercase().as_str() {
            "intent" => intent = Some(value.to_string()),
            "key terms" | "keywords" | "key_terms" => {
                let terms: Vec<String> = value
                    .split(',')
                    .map(|t| t.trim().trim_matches('"').to_lowercase())
                    .filter(|t| !t.is_empty())
                    .take(MAX_KEY_TERMS)
                    .collect();
                if !terms.is_empty() {
                    key_terms = Some(terms);
                }
            }
            "complexity" => complexity = parse_complexity(value),
            _ => {}
        }
    }

    if intent.is_none() && key_terms.is_none() && complexity.is_none() {
        return None;
    }

    let local = local_analysis(query);
    Some(QueryAnalysis {
        intent: intent.unwrap_or(local.intent),
        key_terms: key_terms.unwrap_or(local.key_terms),
        complexity: complexity.unwrap_or(local.complexity),
        source: AnalysisSource::Model,
    })
}

fn parse_complexity(value: &str) -> Option<Complexity> {
    let lower = value.to_lowercase();
    if lower.contains("complex") {
        Some(Complexity::Complex)
    } else if lower.contains("moderate") || lower.contains("medium") {
        Some(Complexity::Moderate)
    } else if lower.contains("simple") || lower.contains("low") {
        Some(Complexity::Simple)
    } else {
        None
    }
}

/// Derive an analysis without calling the model.
pub fn local_analysis(query: &str) -> QueryAnalysis {
    let words: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '-' && c != '_' && c != '.')
        .map(|w| w.trim_matches('.').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    let mut key_terms: Vec<String> = Vec::new();
    for word in &words {
        if word.chars().count() > 2
            && !STOP_WORDS.contains(&word.as_str())
            && !key_terms.contains(word)
        {
            key_terms.push(word.clone());
        }
        if key_terms.len() == MAX_KEY_TERMS {
            break;
        }
    }

    let lower = query.to_lowercase();
    let question_marks = query.matches('?').count();
    let comparative = ["compare", "difference", " versus ", " vs ", "trade-off", "tradeoff"]
        .iter()
        .any(|m| lower.contains(m));

    let complexity = if words.len() > 20 || question_marks > 1 || comparative {
        Complexity::Complex
    } else if words.len() > 10 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    };

    QueryAnalysis {
        intent: intent_for(&lower).to_string(),
        key_terms,
        complexity,
        source: AnalysisSource::Local,
    }
}

fn intent_for(lower_query: &str) -> &'static str {
    let first = lower_query.split_whitespace().next().unwrap_or("");
    match first {
        "what" | "who" | "which" => "find a fact or definition",
        "how" => "understand a procedure or mechanism",
        "why" => "understand a cause or rationale",
        "when" | "where" => "locate a time or place",
        "compare" => "compare alternatives",
        "list" | "show" => "enumerate matching items",
        "summarize" | "summarise" => "summarize material",
        _ => "general information request",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_reply() {
        let reply = "Intent: learn how uploads are indexed\nKey terms: upload, index, chunking\nComplexity: moderate";
        let analysis = parse_analysis(reply, "How are uploads indexed?").unwrap();

        assert_eq!(analysis.intent, "learn how uploads are indexed");
        assert_eq!(analysis.key_terms, vec!["upload", "index", "chunking"]);
        assert_eq!(analysis.complexity, Complexity::Moderate);
        assert_eq!(analysis.source, AnalysisSource::Model);
    }

    #[test]
    fn test_partial_reply_fills_from_local() {
        let reply = "- Complexity: COMPLEX";
        let analysis = parse_analysis(reply, "Why does retrieval fail?").unwrap();

        assert_eq!(analysis.complexity, Complexity::Complex);
        assert_eq!(analysis.intent, "understand a cause or rationale");
        assert!(analysis.key_terms.contains(&"retrieval".to_string()));
    }

    #[test]
    fn test_unusable_reply() {
        assert!(parse_analysis("I cannot help with that.", "q").is_none());
        assert!(parse_analysis("", "q").is_none());
    }

    #[test]
    fn test_local_analysis_simple() {
        let analysis = local_analysis("What is the chunk size?");
        assert_eq!(analysis.complexity, Complexity::Simple);
        assert_eq!(analysis.key_terms, vec!["chunk", "size"]);
        assert_eq!(analysis.source, AnalysisSource::Local);
    }

    #[test]
    fn test_local_analysis_complex() {
        let analysis = local_analysis("Compare the fast mode and the detailed mode");
        assert_eq!(analysis.complexity, Complexity::Complex);

        let analysis = local_analysis("What is X? And how does it relate to Y?");
        assert_eq!(analysis.complexity, Complexity::Complex);
    }

    #[test]
    fn test_local_key_terms_dedup_and_cap() {
        let query = "alpha beta alpha gamma delta epsilon zeta theta iota kappa lambda";
        let analysis = local_analysis(query);
        assert_eq!(analysis.key_terms.len(), 8);
        assert_eq!(analysis.key_terms[0], "alpha");
        assert_eq!(analysis.key_terms[1], "beta");
        assert_eq!(analysis.complexity, Complexity::Moderate);
    }
}
