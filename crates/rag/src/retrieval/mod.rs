//! Retrieval client for the external vector search service.

pub mod retriever;
pub mod service;

pub use retriever::Retriever;
pub use service::{HttpSearchClient, SearchFilters, SearchHit, SearchRequest, SearchService};
