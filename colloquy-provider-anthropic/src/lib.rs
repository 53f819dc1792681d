#![deny(missing_docs)]
//! Anthropic Messages API client for colloquy.
//!
//! [`Anthropic`] implements [`colloquy_turn::Provider`]. Each call is a
//! single non-streaming request; the client never retries, and failures are
//! classified into [`ProviderError`] variants so callers can tell transient
//! problems from fatal ones.

pub mod client;
pub(crate) mod error;
pub mod mapping;
pub mod pricing;
pub mod types;

pub use client::{API_KEY_ENV, Anthropic, DEFAULT_MODEL, DEFAULT_TIMEOUT};

// Re-export for convenience
pub use colloquy_turn::ProviderError;
