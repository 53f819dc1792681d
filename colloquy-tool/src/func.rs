//! Closure-backed tools.
//!
//! Handy for hosts that wrap an existing async function, and for tests.

use std::future::Future;

use crate::tool::{ToolContext, ToolDyn, ToolError, ToolFuture};

/// A tool whose body is an async closure.
///
/// The closure receives the arguments and an owned copy of the call context.
pub struct FnTool<F> {
    name: String,
    description: String,
    input_schema: serde_json::Value,
    f: F,
}

impl<F, Fut> ToolDyn for FnTool<F>
where
    F: Fn(serde_json::Value, ToolContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        self.input_schema.clone()
    }

    fn call<'a>(&'a self, input: serde_json::Value, ctx: &'a ToolContext) -> ToolFuture<'a> {
        Box::pin((self.f)(input, ctx.clone()))
    }
}

/// Create a tool from an async closure.
///
/// # Example
///
/// ```
/// use colloquy_tool::{ToolError, tool_fn};
/// use serde_json::json;
///
/// let tool = tool_fn(
///     "get_weather_forecast",
///     "Weather forecast for a city",
///     json!({"type": "object", "properties": {"city": {"type": "string"}}}),
///     |input, _ctx| async move {
///         let city = input["city"]
///             .as_str()
///             .ok_or_else(|| ToolError::InvalidInput("city is required".into()))?;
///         Ok(format!("Sunny in {city}"))
///     },
/// );
/// ```
#[must_use]
pub fn tool_fn<F, Fut>(
    name: impl Into<String>,
    description: impl Into<String>,
    input_schema: serde_json::Value,
    f: F,
) -> FnTool<F>
where
    F: Fn(serde_json::Value, ToolContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    FnTool {
        name: name.into(),
        description: description.into(),
        input_schema,
        f,
    }
}
