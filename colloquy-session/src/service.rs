//! Chat service: one call per user message.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use colloquy_context::{CompactionThresholds, HistoryCompactor, estimate_tokens};
use colloquy_orchestrator::{
    ExitReason, OrchestratorConfig, TurnError, TurnInput, TurnOrchestrator,
};
use colloquy_tool::ToolRegistry;
use colloquy_turn::{GenerationParams, Message, Provider, TokenUsage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::UsageLedger;
use crate::store::{StoreError, TranscriptStore};

/// Per-request chat settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// System prompt sent with every call of the turn.
    pub system_prompt: String,
    /// Generation settings.
    pub params: GenerationParams,
    /// Tools offered to the model. `None` offers every registered tool;
    /// an empty list disables tool use.
    pub enabled_tools: Option<Vec<String>>,
}

/// Static settings of a [`ChatService`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Defaults for [`ChatService::send`].
    pub chat: ChatConfig,
    /// Turn loop settings.
    pub orchestrator: OrchestratorConfig,
    /// When and how far to compact transcripts.
    pub compaction: CompactionThresholds,
}

/// Reply to one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Assistant text.
    pub reply: String,
    /// Tokens used by the turn.
    pub usage: TokenUsage,
    /// Cost of the turn, when the client prices it.
    pub cost: Decimal,
    /// Completion calls made.
    pub rounds: u32,
    /// Why the turn ended.
    pub exit_reason: ExitReason,
    /// The compacted transcript, when compaction ran before the turn.
    /// Callers mirroring the transcript should replace their copy with it.
    pub compacted: Option<Vec<Message>>,
}

/// Errors from [`ChatService`].
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The user message was empty or whitespace.
    #[error("message is empty")]
    EmptyMessage,
    /// The turn failed. Nothing was persisted.
    #[error(transparent)]
    Turn(#[from] TurnError),
    /// Loading or saving the transcript failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChatError {
    /// Whether sending the same message again later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Turn(e) => e.is_retryable(),
            ChatError::EmptyMessage | ChatError::Store(_) => false,
        }
    }
}

/// Runs chat turns for many sessions over one completion client.
///
/// # Example
///
/// ```ignore
/// let store = MemoryTranscriptStore::new();
/// let service = ChatService::new(client, tools, store, ServiceConfig::default());
/// let reply = service.send("session-1", "What's the weather in Oslo?").await?;
/// println!("{}", reply.reply);
/// ```
pub struct ChatService<P: Provider, S: TranscriptStore> {
    orchestrator: TurnOrchestrator<Arc<P>>,
    compactor: HistoryCompactor<Arc<P>>,
    store: S,
    ledger: Arc<UsageLedger>,
    chat: ChatConfig,
    session_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<P: Provider, S: TranscriptStore> ChatService<P, S> {
    /// Create a service. The client is shared by turns and compaction.
    pub fn new(provider: P, tools: ToolRegistry, store: S, config: ServiceConfig) -> Self {
        let provider = Arc::new(provider);
        let mut compactor = HistoryCompactor::new(Arc::clone(&provider), config.compaction);
        if let Some(model) = config.chat.params.model.clone() {
            compactor = compactor.with_model(model);
        }
        Self {
            orchestrator: TurnOrchestrator::new(provider, tools, config.orchestrator),
            compactor,
            store,
            ledger: Arc::new(UsageLedger::new()),
            chat: config.chat,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Record usage into a shared ledger instead of a private one.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// The usage ledger.
    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    /// The transcript store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Send a message with the default chat settings.
    pub async fn send(&self, session_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        self.send_with(session_id, message, &self.chat).await
    }

    /// Send a message with explicit chat settings.
    ///
    /// The stored transcript changes only when the turn succeeds: it is
    /// replaced by the compacted transcript if compaction ran, then the user
    /// message and the reply (annotated with the turn's usage) are appended.
    pub async fn send_with(
        &self,
        session_id: &str,
        message: &str,
        chat: &ChatConfig,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.send_locked(session_id, message, chat).await
        };
        drop(lock);
        self.prune_session_locks();
        result
    }

    async fn send_locked(
        &self,
        session_id: &str,
        message: &str,
        chat: &ChatConfig,
    ) -> Result<ChatReply, ChatError> {
        let transcript = self.store.load(session_id).await?;

        let (transcript, compacted) = if self.compactor.should_compact(&transcript) {
            let before = transcript.len();
            let tokens_before = estimate_tokens(&transcript);
            let compacted = self.compactor.compact(transcript).await;
            let removed = before.saturating_sub(compacted.len());
            let saved = tokens_before.saturating_sub(estimate_tokens(&compacted));
            (compacted.clone(), Some((compacted, removed, saved)))
        } else {
            (transcript, None)
        };

        let tools = self
            .orchestrator
            .tools()
            .schemas(chat.enabled_tools.as_deref());

        let output = self
            .orchestrator
            .run_turn(TurnInput {
                system_prompt: chat.system_prompt.clone(),
                transcript,
                user_message: message.to_string(),
                params: chat.params.clone(),
                tools,
                session_id: Some(session_id.to_string()),
            })
            .await?;

        let compacted = match compacted {
            Some((compacted, removed, saved)) => {
                self.store.replace(session_id, compacted.clone()).await?;
                self.ledger.record_compaction(removed, saved);
                Some(compacted)
            }
            None => None,
        };
        self.store
            .append(
                session_id,
                &[
                    Message::user(message),
                    Message::assistant(output.reply.clone()).with_usage(output.usage),
                ],
            )
            .await?;

        self.ledger.record(Some(session_id), output.usage, output.cost);

        tracing::info!(
            session = session_id,
            rounds = output.rounds,
            input_tokens = output.usage.input_tokens,
            output_tokens = output.usage.output_tokens,
            compacted = compacted.is_some(),
            "chat turn complete"
        );

        Ok(ChatReply {
            reply: output.reply,
            usage: output.usage,
            cost: output.cost,
            rounds: output.rounds,
            exit_reason: output.exit_reason,
            compacted,
        })
    }

    /// The stored transcript of a session.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>, ChatError> {
        Ok(self.store.load(session_id).await?)
    }

    /// Forget a session's transcript and its ledger entry.
    pub async fn clear(&self, session_id: &str) -> Result<(), ChatError> {
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            let deleted = self.store.delete(session_id).await;
            if deleted.is_ok() {
                self.ledger.forget_session(session_id);
            }
            deleted
        };
        drop(lock);
        self.prune_session_locks();
        result.map_err(ChatError::from)
    }

    /// Sessions with a turn running or waiting for its lock.
    pub fn sessions_in_flight(&self) -> usize {
        self.session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    /// Drop lock entries no caller holds. Clones are only taken under the
    /// map lock, so a count of one means no turn is running or waiting.
    fn prune_session_locks(&self) {
        self.session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
