//! Error types for ragstack.
//!
//! This module defines a unified error enum covering every failure category
//! the query pipeline can observe: configuration, I/O, the two upstream
//! services (vector search and generation), prompt rendering and the
//! conversation logs.

use thiserror::Error;

/// Unified error type for ragstack.
///
/// All fallible functions return `Result<T, AppError>`. Retrieval errors are
/// absorbed by the orchestrator; generation errors become error results.
/// Nothing is allowed to panic on upstream input.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Vector search service unavailable, timed out or returned a failure status
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Generative backend unavailable, timed out or returned a failure status
    #[error("Generation error: {0}")]
    Generation(String),

    /// An upstream service answered with an unexpected payload shape
    #[error("Malformed upstream payload from {service}: {message}")]
    MalformedPayload { service: String, message: String },

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Conversation log errors
    #[error("Conversation error: {0}")]
    Conversation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Build a [`AppError::MalformedPayload`] for the named service.
    pub fn malformed(service: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::MalformedPayload {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether this error originated from the vector search side.
    pub fn is_retrieval(&self) -> bool {
        match self {
            AppError::Retrieval(_) => true,
            AppError::MalformedPayload { service, .. } => service == "search",
            _ => false,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
