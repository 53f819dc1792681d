//! The tool trait, its error type and the per-call context.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by [`ToolDyn::call`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;

/// Errors from tool invocation.
///
/// These never abort a turn; the orchestrator feeds them back to the model
/// as error results.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool with this name is registered, or it is not enabled for the turn.
    #[error("unknown tool: {0}")]
    NotFound(String),
    /// The arguments did not match what the tool expects.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The tool ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The tool did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Ambient information handed to every tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Session the turn belongs to, if the caller supplied one.
    pub session_id: Option<String>,
    /// Successful results of earlier tool calls in the same turn, keyed by tool name.
    /// A later call to the same tool overwrites the earlier entry.
    pub prior_results: HashMap<String, String>,
}

impl ToolContext {
    /// Context for the given session.
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            prior_results: HashMap::new(),
        }
    }

    /// Result of an earlier call to `tool` in this turn.
    pub fn prior_result(&self, tool: &str) -> Option<&str> {
        self.prior_results.get(tool).map(String::as_str)
    }
}

/// A callable tool.
///
/// Object-safe so heterogeneous tools can share one registry.
pub trait ToolDyn: Send + Sync {
    /// Unique tool name, as the model will address it.
    fn name(&self) -> &str;

    /// Human-readable description offered to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments.
    fn input_schema(&self) -> serde_json::Value;

    /// Run the tool and return its textual result.
    fn call<'a>(&'a self, input: serde_json::Value, ctx: &'a ToolContext) -> ToolFuture<'a>;
}
