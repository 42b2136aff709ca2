//! Domain types shared by the prompt and RAG crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Query processing profile.
///
/// `Fast` retrieves fewer chunks and asks for a concise answer; `Detailed`
/// widens retrieval, runs a query analysis pass and asks the model for a
/// self-assessed confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Fast,
    Detailed,
}

impl QueryMode {
    /// Map the host's `fast_mode` flag onto a mode.
    pub fn from_fast_flag(fast_mode: bool) -> Self {
        if fast_mode {
            Self::Fast
        } else {
            Self::Detailed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Detailed => "detailed",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exchange of a conversation.
///
/// Turns are appended once per successful query and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// What the user asked
    pub message: String,

    /// What the assistant answered
    pub response: String,

    /// When the exchange completed
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time.
    pub fn new(message: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}
