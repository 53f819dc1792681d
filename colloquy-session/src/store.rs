//! Transcript storage.

use std::collections::HashMap;

use async_trait::async_trait;
use colloquy_turn::Message;
use tokio::sync::RwLock;

/// Errors from a transcript store.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing storage failed.
    #[error("store backend failed: {0}")]
    Backend(String),
    /// A stored transcript could not be decoded.
    #[error("corrupt transcript for session {session}: {reason}")]
    Corrupt {
        /// Session whose transcript is unreadable.
        session: String,
        /// What went wrong.
        reason: String,
    },
}

/// Durable per-session transcripts.
///
/// Sessions are opaque string keys. Loading an unknown session yields an
/// empty transcript.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// The stored transcript, oldest message first.
    async fn load(&self, session: &str) -> Result<Vec<Message>, StoreError>;

    /// Append messages after the stored ones.
    async fn append(&self, session: &str, messages: &[Message]) -> Result<(), StoreError>;

    /// Replace the whole transcript, for instance after compaction.
    async fn replace(&self, session: &str, messages: Vec<Message>) -> Result<(), StoreError>;

    /// Forget the session.
    async fn delete(&self, session: &str) -> Result<(), StoreError>;
}

/// In-memory store backed by a `HashMap` behind a `RwLock`.
///
/// Suitable for tests and single-process use where transcripts need not
/// survive a restart.
#[derive(Default)]
pub struct MemoryTranscriptStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl MemoryTranscriptStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a stored transcript.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn load(&self, session: &str) -> Result<Vec<Message>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session).cloned().unwrap_or_default())
    }

    async fn append(&self, session: &str, messages: &[Message]) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn replace(&self, session: &str, messages: Vec<Message>) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.to_string(), messages);
        Ok(())
    }

    async fn delete(&self, session: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session);
        Ok(())
    }
}
