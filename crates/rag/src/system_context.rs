//! Time-bounded cache of the derived system context.
//!
//! The snapshot is rebuilt lazily: the first call after the TTL expires
//! performs the retrieval while holding the lock, so concurrent callers wait
//! for one refresh instead of issuing their own.

use crate::retrieval::Retriever;
use crate::types::{RetrievedChunk, SYSTEM_TAG};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Used when retrieval yields nothing recognizable.
pub const STATIC_SYSTEM_CONTEXT: &str = "SYSTEM OVERVIEW\n\
This assistant answers questions about documents that users have uploaded and indexed. \
Answers are grounded in passages retrieved by semantic search and cite their source files.";

const MAX_LINES_PER_SECTION: usize = 3;
const MAX_LINE_CHARS: usize = 200;

const ARCHITECTURE_MARKERS: &[&str] = &[
    "architecture",
    "component",
    "service",
    "pipeline",
    "database",
    "index",
];
const CAPABILITY_MARKERS: &[&str] = &["feature", "capabilit", "support", "enable", "allows"];
const API_MARKERS: &[&str] = &["api", "endpoint", "route", "http"];

/// A derived description of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemContextSnapshot {
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

struct CachedSnapshot {
    snapshot: SystemContextSnapshot,
    refreshed: Instant,
}

/// Lazily refreshed system context, owned by the orchestrator.
pub struct SystemContextCache {
    ttl: Duration,
    query: String,
    top_k: usize,
    min_similarity: f32,
    state: Mutex<Option<CachedSnapshot>>,
}

impl SystemContextCache {
    pub fn new(ttl: Duration, query: impl Into<String>, top_k: usize, min_similarity: f32) -> Self {
        Self {
            ttl,
            query: query.into(),
            top_k,
            min_similarity,
            state: Mutex::new(None),
        }
    }

    /// Current context text, refreshing first if missing or expired.
    ///
    /// Never returns an empty string.
    pub async fn get_context(&self, retriever: &Retriever) -> String {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if cached.refreshed.elapsed() < self.ttl {
                return cached.snapshot.text.clone();
            }
            tracing::debug!("System context expired, refreshing");
        }

        let chunks = retriever
            .search(&self.query, self.top_k, self.min_similarity, None)
            .await;
        let snapshot = SystemContextSnapshot {
            text: derive_context(&chunks),
            generated_at: Utc::now(),
        };

        tracing::info!(
            chunks = chunks.len(),
            "Refreshed system context ({} chars)",
            snapshot.text.len()
        );

        let text = snapshot.text.clone();
        *state = Some(CachedSnapshot {
            snapshot,
            refreshed: Instant::now(),
        });
        text
    }

    /// The cached snapshot, if any, without refreshing.
    pub async fn snapshot(&self) -> Option<SystemContextSnapshot> {
        self.state.lock().await.as_ref().map(|c| c.snapshot.clone())
    }

    /// Drop the snapshot so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}

/// Build a short structured description from system-tagged chunks.
///
/// User documents never contribute. Falls back to [`STATIC_SYSTEM_CONTEXT`]
/// when there are no system chunks or no marker matches.
pub fn derive_context(chunks: &[RetrievedChunk]) -> String {
    let mut architecture = Vec::new();
    let mut capabilities = Vec::new();
    let mut api = Vec::new();
    let mut sources: Vec<&str> = Vec::new();

    for chunk in chunks.iter().filter(|c| c.has_tag(SYSTEM_TAG)) {
        let mut used = false;

        for line in sentences(&chunk.text) {
            let lower = line.to_lowercase();
            let section = if contains_any(&lower, API_MARKERS) {
                &mut api
            } else if contains_any(&lower, ARCHITECTURE_MARKERS) {
                &mut architecture
            } else if contains_any(&lower, CAPABILITY_MARKERS) {
                &mut capabilities
            } else {
                continue;
            };

            let line = ragstack_prompt::truncate_chars(line, MAX_LINE_CHARS);
            if section.len() < MAX_LINES_PER_SECTION && !section.contains(&line) {
                section.push(line);
                used = true;
            }
        }

        if used && !sources.contains(&chunk.filename.as_str()) {
            sources.push(&chunk.filename);
        }
    }

    if architecture.is_empty() && capabilities.is_empty() && api.is_empty() {
        return STATIC_SYSTEM_CONTEXT.to_string();
    }

    let mut out = String::from("SYSTEM OVERVIEW");
    for (title, lines) in [
        ("Architecture", &architecture),
        ("Capabilities", &capabilities),
        ("API", &api),
    ] {
        if lines.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}:", title));
        for line in lines {
            out.push_str(&format!("\n- {}", line));
        }
    }
    out.push_str(&format!("\nSources: {}", sources.join(", ")));

    out
}

/// Sentences split on ". " and line breaks, so "v2.0" and "app.yaml" stay whole.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .flat_map(|line| line.split(". "))
        .map(|s| s.trim().trim_end_matches('.').trim_end())
        .filter(|s| s.len() > 3)
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ChunkClassifier;
    use crate::retrieval::SearchHit;
    use crate::types::USER_TAG;
    use crate::tests::mocks::MockSearch;
    use std::sync::Arc;

    fn system_hits() -> Vec<SearchHit> {
        vec![SearchHit {
            filename: "system_overview.md".to_string(),
            text: "The architecture has three components. It supports PDF upload.\nThe API exposes /api/chat."
                .to_string(),
            similarity: 0.7,
            chunk_index: 0,
        }]
    }

    fn retriever(search: Arc<MockSearch>) -> Retriever {
        Retriever::new(search, ChunkClassifier::new(&["system".to_string()]))
    }

    #[test]
    fn test_derive_context_sections() {
        let chunks = vec![RetrievedChunk::new(
            "system_overview.md",
            "The architecture has three components. It supports PDF upload.\nThe API exposes /api/chat.",
            0.7,
            0,
        )
        .with_tag(SYSTEM_TAG)];

        let text = derive_context(&chunks);
        assert!(text.starts_with("SYSTEM OVERVIEW"));
        assert!(text.contains("Architecture:\n- The architecture has three components"));
        assert!(text.contains("Capabilities:\n- It supports PDF upload"));
        assert!(text.contains("API:\n- The API exposes /api/chat"));
        assert!(text.contains("Sources: system_overview.md"));
    }

    #[test]
    fn test_derive_context_falls_back() {
        assert_eq!(derive_context(&[]), STATIC_SYSTEM_CONTEXT);

        let chunks = vec![RetrievedChunk::new("notes.txt", "Lunch at noon", 0.5, 0).with_tag(SYSTEM_TAG)];
        assert_eq!(derive_context(&chunks), STATIC_SYSTEM_CONTEXT);
    }

    #[test]
    fn test_user_chunks_never_enter_context() {
        let diary = RetrievedChunk::new(
            "diary.txt",
            "My landlord supports late rent. Version 2.0 of the api is out",
            0.9,
            0,
        )
        .with_tag(USER_TAG);
        assert_eq!(derive_context(&[diary.clone()]), STATIC_SYSTEM_CONTEXT);

        let config = RetrievedChunk::new("app.yaml", "The service pipeline indexes uploads.", 0.6, 0)
            .with_tag(SYSTEM_TAG);
        let text = derive_context(&[diary, config]);
        assert!(text.contains("The service pipeline indexes uploads"));
        assert!(!text.contains("landlord"));
        assert!(!text.contains("diary.txt"));
    }

    #[test]
    fn test_version_numbers_stay_whole() {
        let chunks = vec![RetrievedChunk::new(
            "system_overview.md",
            "Version 2.0 of the api is out. Settings live in app.yaml",
            0.7,
            0,
        )
        .with_tag(SYSTEM_TAG)];

        let text = derive_context(&chunks);
        assert!(text.contains("API:\n- Version 2.0 of the api is out"));
    }

    #[tokio::test]
    async fn test_within_ttl_returns_cached_text() {
        let search = Arc::new(MockSearch::with_hits(system_hits()));
        let retriever = retriever(search.clone());
        let cache = SystemContextCache::new(Duration::from_secs(300), "system", 10, 0.3);

        let first = cache.get_context(&retriever).await;
        let second = cache.get_context(&retriever).await;

        assert_eq!(first, second);
        assert_eq!(search.call_count(), 1);
        assert!(cache.snapshot().await.is_some());
    }

    #[tokio::test]
    async fn test_expired_snapshot_refreshes_once_per_call() {
        let search = Arc::new(MockSearch::with_hits(system_hits()));
        let retriever = retriever(search.clone());
        let cache = SystemContextCache::new(Duration::ZERO, "system", 10, 0.3);

        cache.get_context(&retriever).await;
        assert_eq!(search.call_count(), 1);
        cache.get_context(&retriever).await;
        assert_eq!(search.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let search = Arc::new(MockSearch::with_hits(system_hits()));
        let retriever = retriever(search.clone());
        let cache = SystemContextCache::new(Duration::from_secs(300), "system", 10, 0.3);

        cache.get_context(&retriever).await;
        cache.invalidate().await;
        assert!(cache.snapshot().await.is_none());
        cache.get_context(&retriever).await;
        assert_eq!(search.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_retrieval_never_yields_empty() {
        let retriever = retriever(Arc::new(MockSearch::failing()));
        let cache = SystemContextCache::new(Duration::from_secs(300), "system", 10, 0.3);

        assert_eq!(cache.get_context(&retriever).await, STATIC_SYSTEM_CONTEXT);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let search = Arc::new(MockSearch::with_hits(system_hits()));
        let retriever = retriever(search.clone());
        let cache = Arc::new(SystemContextCache::new(Duration::from_secs(300), "system", 10, 0.3));

        let (a, b) = tokio::join!(cache.get_context(&retriever), cache.get_context(&retriever));
        assert_eq!(a, b);
        assert_eq!(search.call_count(), 1);
    }
}
