//! Anthropic Messages API request/response types.

use serde::{Deserialize, Serialize};

/// Anthropic API request body.
#[derive(Debug, Serialize)]
pub struct ApiRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Conversation messages.
    pub messages: Vec<ApiMessage<'a>>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    /// Sequences that end generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<&'a [String]>,
    /// Tools available to the model.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ApiTool<'a>>,
}

/// A message in the Anthropic API format.
#[derive(Debug, Serialize)]
pub struct ApiMessage<'a> {
    /// Role: "user" or "assistant".
    pub role: &'static str,
    /// Message content.
    pub content: ApiContent<'a>,
}

/// Content can be a string or array of content blocks.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApiContent<'a> {
    /// Simple text string.
    Text(&'a str),
    /// Array of content blocks.
    Blocks(Vec<ApiBlock<'a>>),
}

/// An outgoing content block.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiBlock<'a> {
    /// Text content.
    Text {
        /// The text content.
        text: &'a str,
    },
    /// Tool use request echoed back from an earlier response.
    ToolUse {
        /// Tool use identifier.
        id: &'a str,
        /// Tool name.
        name: &'a str,
        /// Tool input parameters.
        input: &'a serde_json::Value,
    },
    /// Tool result.
    ToolResult {
        /// The tool use ID this result is for.
        tool_use_id: &'a str,
        /// The result content.
        content: &'a str,
        /// Whether this result represents an error.
        is_error: bool,
    },
}

/// Tool definition for the Anthropic API.
#[derive(Debug, Serialize)]
pub struct ApiTool<'a> {
    /// Tool name.
    pub name: &'a str,
    /// Tool description.
    pub description: &'a str,
    /// JSON Schema for the tool input.
    pub input_schema: &'a serde_json::Value,
}

/// Anthropic API response body.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    /// Model that generated the response.
    pub model: String,
    /// Response content blocks.
    pub content: Vec<ApiResponseBlock>,
    /// Stop reason. Absent on some error-shaped bodies.
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage.
    #[serde(default)]
    pub usage: ApiUsage,
}

/// A content block in a response.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiResponseBlock {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Tool use request.
    ToolUse {
        /// Tool use identifier.
        id: String,
        /// Tool name.
        name: String,
        /// Tool input parameters.
        #[serde(default)]
        input: serde_json::Value,
    },
    /// Any block type colloquy does not model, such as thinking blocks.
    #[serde(other)]
    Unsupported,
}

/// Token usage from the Anthropic API.
#[derive(Debug, Default, Deserialize)]
pub struct ApiUsage {
    /// Input tokens used.
    #[serde(default)]
    pub input_tokens: u64,
    /// Output tokens generated.
    #[serde(default)]
    pub output_tokens: u64,
}
