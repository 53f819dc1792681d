//! Transcript compaction for long-running conversations.
//!
//! Once a transcript reaches a configured number of dialog messages, the
//! [`HistoryCompactor`] replaces everything but the most recent exchanges
//! with a single summary message.

pub mod compactor;

pub use compactor::{
    CompactionThresholds, HistoryCompactor, Summary, estimate_tokens, fallback_summary,
    render_conversation, summary_message, summary_request,
};
