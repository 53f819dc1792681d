//! Completion client trait for LLM backends.
//!
//! The [`Provider`] trait uses RPITIT (return-position `impl Trait` in traits)
//! and is not object-safe. Consumers are generic over `P: Provider`.

use crate::types::{CompletionRequest, CompletionResponse};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from completion clients.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials are missing or were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The service rate-limited the request.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested delay before trying again, if the service sent one.
        retry_after: Option<Duration>,
    },

    /// Transport failure: connection refused, reset, DNS, or service unavailable.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The call did not finish within the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with something we could not interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ProviderError {
    /// Whether retrying the whole turn later might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Connection(_)
                | ProviderError::Timeout(_)
        )
    }

    /// Delay suggested by the service for rate-limited requests.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Completion service interface.
///
/// One call is one round: the client sends the request and returns either
/// a final answer or tool requests, together with that exchange's usage.
/// Clients never retry on their own.
pub trait Provider: Send + Sync {
    /// Send a completion request.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;
}

impl<P: Provider> Provider for Arc<P> {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        (**self).complete(request)
    }
}
