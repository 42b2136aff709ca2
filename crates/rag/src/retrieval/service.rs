//! Vector search service client.

use async_trait::async_trait;
use ragstack_core::config::DEFAULT_SEARCH_URL;
use ragstack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const SERVICE: &str = "search";

/// Optional metadata filters forwarded to the search service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchFilters(BTreeMap<String, serde_json::Value>);

impl SearchFilters {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary filter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Filter by file types
    pub fn with_file_types(self, file_types: Vec<String>) -> Self {
        self.with("fileTypes", file_types)
    }

    /// Restrict to the named documents
    pub fn with_filenames(self, filenames: Vec<String>) -> Self {
        self.with("filenames", filenames)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Request body for `POST /search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,

    #[serde(rename = "topK")]
    pub top_k: usize,

    #[serde(rename = "minSimilarity")]
    pub min_similarity: f32,

    #[serde(skip_serializing_if = "SearchFilters::is_empty")]
    pub filters: SearchFilters,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize, min_similarity: f32) -> Self {
        Self {
            query: query.into(),
            top_k,
            min_similarity,
            filters: SearchFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// One result as returned by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub filename: String,
    pub text: String,
    pub similarity: f32,
    #[serde(default)]
    pub chunk_index: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// Trait for vector search backends.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run one semantic search. A single attempt; no retries.
    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<SearchHit>>;

    /// Check that the service is reachable.
    async fn health(&self) -> AppResult<()> {
        Ok(())
    }
}

/// HTTP client for the vector search service.
pub struct HttpSearchClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSearchClient {
    /// Create a client against the default local endpoint.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_SEARCH_URL, timeout)
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Retrieval(format!(
                "Search service did not answer within {}s",
                self.timeout.as_secs()
            ))
        } else {
            AppError::Retrieval(format!("Failed to reach search service: {}", e))
        }
    }
}

#[async_trait]
impl SearchService for HttpSearchClient {
    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);
        tracing::debug!(top_k = request.top_k, "Searching {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Retrieval(format!(
                "Search service error ({}): {}",
                status, error_text
            )));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::malformed(SERVICE, format!("unexpected response body: {}", e)))?;

        Ok(parsed.results)
    }

    async fn health(&self) -> AppResult<()> {
        let url = format!("{}/status", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Retrieval(format!(
                "Search service status check failed ({})",
                response.status()
            )))
        }
    }
}
