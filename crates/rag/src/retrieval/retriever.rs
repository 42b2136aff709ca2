//! Retrieval with normalization and graceful degradation.

use crate::config::MAX_TOP_K;
use crate::context::ChunkClassifier;
use crate::retrieval::service::{SearchFilters, SearchHit, SearchRequest, SearchService};
use crate::types::RetrievedChunk;
use ragstack_core::AppResult;
use std::sync::Arc;

/// Wraps a [`SearchService`] and turns its hits into tagged chunks.
#[derive(Clone)]
pub struct Retriever {
    service: Arc<dyn SearchService>,
    classifier: ChunkClassifier,
}

impl Retriever {
    pub fn new(service: Arc<dyn SearchService>, classifier: ChunkClassifier) -> Self {
        Self {
            service,
            classifier,
        }
    }

    /// Search, absorbing any failure into an empty result.
    ///
    /// Failures are logged and never reach the caller; retrieval trouble
    /// means "no context", not a failed query.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f32,
        filters: Option<&SearchFilters>,
    ) -> Vec<RetrievedChunk> {
        match self.try_search(query, top_k, min_similarity, filters).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// Search and return upstream failures.
    pub async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        min_similarity: f32,
        filters: Option<&SearchFilters>,
    ) -> AppResult<Vec<RetrievedChunk>> {
        let top_k = top_k.clamp(1, MAX_TOP_K);
        let min_similarity = normalize_similarity(min_similarity);

        let mut request = SearchRequest::new(query, top_k, min_similarity);
        if let Some(filters) = filters {
            request = request.with_filters(filters.clone());
        }

        let hits = self.service.search(&request).await?;
        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .take(top_k)
            .map(|hit| self.to_chunk(hit))
            .collect();

        tracing::debug!(
            "Retrieved {} chunks (top score: {:.3})",
            chunks.len(),
            chunks.first().map(|c| c.similarity).unwrap_or(0.0)
        );

        Ok(chunks)
    }

    fn to_chunk(&self, hit: SearchHit) -> RetrievedChunk {
        self.classifier.tag(RetrievedChunk::new(
            hit.filename,
            hit.text,
            normalize_similarity(hit.similarity),
            hit.chunk_index,
        ))
    }
}

/// Clamp a similarity into [0, 1]; non-finite values become 0.
fn normalize_similarity(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockSearch;
    use crate::types::{SYSTEM_TAG, USER_TAG};

    fn classifier() -> ChunkClassifier {
        ChunkClassifier::new(&["config".to_string()])
    }

    #[tokio::test]
    async fn test_hits_are_tagged_and_normalized() {
        let search = Arc::new(MockSearch::with_hits(vec![
            SearchHit {
                filename: "config.json".to_string(),
                text: "port 8080".to_string(),
                similarity: 1.4,
                chunk_index: 0,
            },
            SearchHit {
                filename: "notes.txt".to_string(),
                text: "notes".to_string(),
                similarity: f32::NAN,
                chunk_index: 3,
            },
        ]));
        let retriever = Retriever::new(search, classifier());

        let chunks = retriever.search("port?", 5, 0.3, None).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].similarity, 1.0);
        assert!(chunks[0].has_tag(SYSTEM_TAG));
        assert_eq!(chunks[1].similarity, 0.0);
        assert!(chunks[1].has_tag(USER_TAG));
    }

    #[tokio::test]
    async fn test_top_k_is_clamped() {
        let search = Arc::new(MockSearch::empty());
        let retriever = Retriever::new(search.clone(), classifier());

        retriever.search("q", 50, 2.0, None).await;
        retriever.search("q", 0, -1.0, None).await;

        let requests = search.requests();
        assert_eq!(requests[0].top_k, 10);
        assert_eq!(requests[0].min_similarity, 1.0);
        assert_eq!(requests[1].top_k, 1);
        assert_eq!(requests[1].min_similarity, 0.0);
    }

    #[tokio::test]
    async fn test_extra_hits_are_dropped() {
        let hits = (0..6)
            .map(|i| SearchHit {
                filename: format!("doc{}.txt", i),
                text: "t".to_string(),
                similarity: 0.5,
                chunk_index: 0,
            })
            .collect();
        let retriever = Retriever::new(Arc::new(MockSearch::with_hits(hits)), classifier());

        assert_eq!(retriever.search("q", 3, 0.3, None).await.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty() {
        let retriever = Retriever::new(Arc::new(MockSearch::failing()), classifier());

        assert!(retriever.search("q", 5, 0.3, None).await.is_empty());
        assert!(retriever.try_search("q", 5, 0.3, None).await.is_err());
    }

    #[tokio::test]
    async fn test_filters_are_forwarded() {
        let search = Arc::new(MockSearch::empty());
        let retriever = Retriever::new(search.clone(), classifier());
        let filters = SearchFilters::new().with_filenames(vec!["a.txt".to_string()]);

        retriever.search("q", 5, 0.3, Some(&filters)).await;
        assert_eq!(search.requests()[0].filters, filters);
    }
}
