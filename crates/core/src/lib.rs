//! ragstack core library
//!
//! This crate provides the foundational utilities shared by every ragstack crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Shared domain types (`QueryMode`, `ConversationTurn`)

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, ServicesConfig};
pub use error::{AppError, AppResult};
pub use types::{ConversationTurn, QueryMode};
