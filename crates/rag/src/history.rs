//! Conversation logs.
//!
//! Turns are append-only. The JSONL store keeps one file per conversation
//! under `.ragstack/conversations/<id>.jsonl`.

use crate::config::get_conversations_dir;
use async_trait::async_trait;
use ragstack_core::{AppError, AppResult, ConversationTurn};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only store of conversation turns keyed by conversation id.
#[async_trait]
pub trait ConversationLog: Send + Sync {
    /// All turns of a conversation, oldest first.
    async fn turns(&self, conversation_id: &str) -> AppResult<Vec<ConversationTurn>>;

    /// Append a turn.
    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> AppResult<()>;

    /// Delete a conversation.
    async fn clear(&self, conversation_id: &str) -> AppResult<()>;

    /// Known conversation ids, sorted.
    async fn list_conversations(&self) -> AppResult<Vec<String>>;

    /// The last `limit` turns, oldest first.
    async fn recent(&self, conversation_id: &str, limit: usize) -> AppResult<Vec<ConversationTurn>> {
        let mut turns = self.turns(conversation_id).await?;
        let skip = turns.len().saturating_sub(limit);
        Ok(turns.split_off(skip))
    }
}

/// Reject ids that could escape the conversations directory.
pub fn validate_conversation_id(conversation_id: &str) -> AppResult<()> {
    let valid = !conversation_id.is_empty()
        && conversation_id.len() <= 128
        && conversation_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AppError::Conversation(format!(
            "Invalid conversation id '{}': use letters, digits, '-' or '_'",
            conversation_id
        )))
    }
}

/// Process-local conversation log.
#[derive(Default)]
pub struct InMemoryConversationLog {
    conversations: Mutex<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemoryConversationLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationLog for InMemoryConversationLog {
    async fn turns(&self, conversation_id: &str) -> AppResult<Vec<ConversationTurn>> {
        Ok(self
            .conversations
            .lock()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> AppResult<()> {
        validate_conversation_id(conversation_id)?;
        self.conversations
            .lock()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> AppResult<()> {
        self.conversations.lock().await.remove(conversation_id);
        Ok(())
    }

    async fn list_conversations(&self) -> AppResult<Vec<String>> {
        let mut ids: Vec<String> = self.conversations.lock().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Conversation log persisted as JSON lines.
pub struct JsonlConversationLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlConversationLog {
    /// Create a log rooted at the workspace's conversations directory.
    pub fn new(workspace: &Path) -> Self {
        Self::with_dir(get_conversations_dir(workspace))
    }

    /// Create a log rooted at an explicit directory.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    fn log_path(&self, conversation_id: &str) -> AppResult<PathBuf> {
        validate_conversation_id(conversation_id)?;
        Ok(self.dir.join(format!("{}.jsonl", conversation_id)))
    }

    /// Whole log text; a missing file reads as empty.
    async fn read_log(path: &Path) -> AppResult<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(AppError::Conversation(format!(
                "Failed to read {:?}: {}",
                path, e
            ))),
        }
    }

    /// Non-empty lines with their 1-based line numbers.
    fn entries(content: &str) -> Vec<(usize, &str)> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| (i + 1, line))
            .collect()
    }

    fn parse_turns(path: &Path, entries: &[(usize, &str)]) -> AppResult<Vec<ConversationTurn>> {
        entries
            .iter()
            .map(|(line_num, line)| {
                serde_json::from_str(line).map_err(|e| {
                    AppError::Conversation(format!(
                        "Failed to parse line {} in {:?}: {}",
                        line_num, path, e
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl ConversationLog for JsonlConversationLog {
    async fn turns(&self, conversation_id: &str) -> AppResult<Vec<ConversationTurn>> {
        let path = self.log_path(conversation_id)?;
        let _guard = self.write_lock.lock().await;
        let content = Self::read_log(&path).await?;
        let turns = Self::parse_turns(&path, &Self::entries(&content))?;
        tracing::debug!("Read {} turns for conversation {}", turns.len(), conversation_id);
        Ok(turns)
    }

    /// Parses only the trailing `limit` lines.
    async fn recent(&self, conversation_id: &str, limit: usize) -> AppResult<Vec<ConversationTurn>> {
        let path = self.log_path(conversation_id)?;
        let _guard = self.write_lock.lock().await;
        let content = Self::read_log(&path).await?;
        let entries = Self::entries(&content);
        let skip = entries.len().saturating_sub(limit);
        Self::parse_turns(&path, &entries[skip..])
    }

    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> AppResult<()> {
        let path = self.log_path(conversation_id)?;
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::Conversation(format!("Failed to open {:?}: {}", path, e)))?;

        let json_line = serde_json::to_string(&turn)?;

        // One write per turn so a line is never split across writers
        file.write_all(format!("{}\n", json_line).as_bytes())
            .await
            .map_err(|e| AppError::Conversation(format!("Failed to write {:?}: {}", path, e)))?;

        file.sync_all()
            .await
            .map_err(|e| AppError::Conversation(format!("Failed to sync {:?}: {}", path, e)))?;

        tracing::debug!("Appended turn to conversation {}", conversation_id);
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> AppResult<()> {
        let path = self.log_path(conversation_id)?;
        let _guard = self.write_lock.lock().await;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Cleared conversation {}", conversation_id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Conversation(format!(
                "Failed to delete {:?}: {}",
                path, e
            ))),
        }
    }

    async fn list_conversations(&self) -> AppResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}
