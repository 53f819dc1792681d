#![deny(missing_docs)]
//! Shared vocabulary for a colloquy conversation turn.
//!
//! Provides the message and usage model, the [`Provider`] trait that wraps
//! a remote completion service, and the generation parameters sent with
//! every completion call.

pub mod config;
pub mod provider;
pub mod types;

// Re-exports
pub use config::GenerationParams;
pub use provider::{Provider, ProviderError};
pub use types::*;
