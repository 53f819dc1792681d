//! Process-wide token usage ledger.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use colloquy_turn::TokenUsage;
use rust_decimal::Decimal;
use serde::Serialize;

/// Usage of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionUsage {
    /// Session key.
    pub session_id: String,
    /// Tokens over all recorded turns.
    pub usage: TokenUsage,
    /// Cost over all recorded turns.
    pub cost: Decimal,
    /// Turns recorded.
    pub requests: u64,
}

/// Point-in-time view of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSnapshot {
    /// Tokens over all sessions.
    pub total: TokenUsage,
    /// Cost over all sessions.
    pub cost: Decimal,
    /// Turns recorded.
    pub requests: u64,
    /// Compactions performed.
    pub compactions: u64,
    /// Messages removed from transcripts by compaction.
    pub messages_compacted: u64,
    /// Estimated prompt tokens saved by compaction.
    pub tokens_saved: u64,
    /// Mean input tokens per turn.
    pub average_input: f64,
    /// Mean output tokens per turn.
    pub average_output: f64,
    /// Sessions with the highest total token use, largest first.
    pub top_sessions: Vec<SessionUsage>,
}

#[derive(Default)]
struct LedgerState {
    total: TokenUsage,
    cost: Decimal,
    requests: u64,
    compactions: u64,
    messages_compacted: u64,
    tokens_saved: u64,
    sessions: HashMap<String, SessionUsage>,
}

/// Token and cost totals, globally and per session.
///
/// Only successful turns are recorded.
#[derive(Default)]
pub struct UsageLedger {
    state: Mutex<LedgerState>,
}

impl UsageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one completed turn.
    pub fn record(&self, session_id: Option<&str>, usage: TokenUsage, cost: Decimal) {
        let mut state = self.state();
        state.total += usage;
        state.cost += cost;
        state.requests += 1;

        if let Some(id) = session_id {
            let entry = state
                .sessions
                .entry(id.to_string())
                .or_insert_with(|| SessionUsage {
                    session_id: id.to_string(),
                    ..Default::default()
                });
            entry.usage += usage;
            entry.cost += cost;
            entry.requests += 1;
        }

        tracing::debug!(
            session = session_id.unwrap_or("-"),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "usage recorded"
        );
    }

    /// Record a compaction that removed `removed` messages and saved an
    /// estimated `tokens_saved` prompt tokens.
    pub fn record_compaction(&self, removed: usize, tokens_saved: u64) {
        let mut state = self.state();
        state.compactions += 1;
        state.messages_compacted += removed as u64;
        state.tokens_saved += tokens_saved;
        tracing::info!(removed, tokens_saved, "compaction recorded");
    }

    /// Usage of one session, if any turn was recorded for it.
    pub fn session(&self, session_id: &str) -> Option<SessionUsage> {
        self.state().sessions.get(session_id).cloned()
    }

    /// Drop the per-session entry. Global totals are kept.
    pub fn forget_session(&self, session_id: &str) {
        self.state().sessions.remove(session_id);
    }

    /// Current totals with the `top` heaviest sessions.
    pub fn snapshot(&self, top: usize) -> LedgerSnapshot {
        let state = self.state();
        let mut sessions: Vec<SessionUsage> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| {
            b.usage
                .total()
                .cmp(&a.usage.total())
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions.truncate(top);

        let (average_input, average_output) = if state.requests == 0 {
            (0.0, 0.0)
        } else {
            let n = state.requests as f64;
            (
                state.total.input_tokens as f64 / n,
                state.total.output_tokens as f64 / n,
            )
        };

        LedgerSnapshot {
            total: state.total,
            cost: state.cost,
            requests: state.requests,
            compactions: state.compactions,
            messages_compacted: state.messages_compacted,
            tokens_saved: state.tokens_saved,
            average_input,
            average_output,
            top_sessions: sessions,
        }
    }
}
