#![deny(missing_docs)]
//! Session layer for colloquy.
//!
//! [`ChatService`] is the caller side of a turn: it loads a session's
//! transcript from a [`TranscriptStore`], compacts it when it has grown
//! long, runs the turn, persists the new messages and records token usage
//! in a [`UsageLedger`]. Turns of the same session are serialized; turns of
//! different sessions run independently.

pub mod ledger;
pub mod service;
pub mod store;

pub use ledger::{LedgerSnapshot, SessionUsage, UsageLedger};
pub use service::{ChatConfig, ChatError, ChatReply, ChatService, ServiceConfig};
pub use store::{MemoryTranscriptStore, StoreError, TranscriptStore};
