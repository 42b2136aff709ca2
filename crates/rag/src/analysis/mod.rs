//! Response analysis: citations, confidence, query analysis and the
//! reasoning summary.
//!
//! Citation extraction and confidence estimation sit behind traits so hosts
//! and tests can swap in deterministic stand-ins.

pub mod citations;
pub mod confidence;
pub mod query;
pub mod reasoning;

pub use citations::{CitationExtractor, MarkerCitationExtractor};
pub use confidence::{answer_confidence, parse_self_assessment, ConfidenceEstimator, HeuristicConfidence};
pub use query::{local_analysis, parse_analysis};
pub use reasoning::reasoning_chain;
