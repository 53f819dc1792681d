//! Tool registry: register, list, and invoke tools by name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use colloquy_turn::ToolSchema;

use crate::tool::{ToolContext, ToolDyn, ToolError};

/// Upper bound on a single tool invocation unless overridden.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry of tools keyed by name.
///
/// Registering a second tool under an existing name replaces the first.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
    timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry with the default timeout.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.tools.get(name).cloned()
    }

    /// Iterate over all registered tools in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The tool catalog, sorted by name.
    ///
    /// With `enabled` set, only tools whose names appear in it are listed.
    pub fn schemas(&self, enabled: Option<&[String]>) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .filter(|tool| enabled.is_none_or(|names| names.iter().any(|n| n == tool.name())))
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Invoke a tool by name, bounded by the registry timeout.
    pub async fn invoke(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        tracing::debug!(tool = %name, "invoking tool");
        match tokio::time::timeout(self.timeout, tool.call(input, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout(self.timeout)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
