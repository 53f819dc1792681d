//! Message, content and usage types shared by every colloquy crate.
//!
//! These are the internal lingua franca. Completion clients convert their
//! wire formats to and from these types.

use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions). Never persisted in a transcript.
    System,
    /// User message.
    User,
    /// Assistant (model) message.
    Assistant,
}

impl Role {
    /// Whether this role takes part in the dialog (user or assistant).
    pub fn is_dialog(self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }

    /// Lowercase wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single block of structured message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A tool invocation requested by the model.
    ToolUse {
        /// Identifier the matching result must echo back.
        id: String,
        /// Name of the tool to invoke.
        name: String,
        /// Tool arguments.
        input: serde_json::Value,
    },
    /// Outcome of a tool invocation, paired with its request by id.
    ToolResult {
        /// The `ToolUse` id this result answers.
        tool_use_id: String,
        /// Result text, or the error description when `is_error` is set.
        content: String,
        /// Whether the invocation failed.
        is_error: bool,
    },
}

impl ContentBlock {
    /// Build a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// A tool invocation request pulled out of a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    /// Request id, copied verbatim into the result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    pub input: serde_json::Value,
}

/// Message content: either plain text or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// Structured blocks (tool requests, tool results, text).
    Blocks(Vec<ContentBlock>),
}

impl Content {
    /// Plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    /// The text if this is plain text content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Blocks(_) => None,
        }
    }

    /// Whether the content carries nothing worth sending.
    pub fn is_blank(&self) -> bool {
        match self {
            Content::Text(text) => text.trim().is_empty(),
            Content::Blocks(blocks) => blocks.is_empty(),
        }
    }

    /// Text of the content with all non-text blocks dropped.
    pub fn plain_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => text_of(blocks),
        }
    }

    /// Tool invocation requests contained in this content, in order.
    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        match self {
            Content::Text(_) => Vec::new(),
            Content::Blocks(blocks) => tool_requests_of(blocks),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

/// Concatenate the text blocks of a block list, in order, without separators.
pub fn text_of(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Extract the tool requests of a block list, in order.
pub fn tool_requests_of(blocks: &[ContentBlock]) -> Vec<ToolRequest> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolRequest {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Token usage of one completion call, or the running total of a turn.
///
/// Totals are built by value: each round's usage is folded in with
/// [`TokenUsage::accumulate`] and the result handed to the next round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Usage with the given counts.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Input plus output tokens.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Fold another usage report into this total.
    #[must_use]
    pub fn accumulate(self, other: TokenUsage) -> Self {
        Self {
            input_tokens: self.input_tokens.saturating_add(other.input_tokens),
            output_tokens: self.output_tokens.saturating_add(other.output_tokens),
        }
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        self.accumulate(rhs)
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        *self = self.accumulate(rhs);
    }
}

/// A message in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// Message content.
    pub content: Content,
    /// Token usage attributed to this message, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Message {
    /// A message with the given role and content.
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
            usage: None,
        }
    }

    /// A plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::Text(text.into()))
    }

    /// A plain-text assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::Text(text.into()))
    }

    /// Attach a usage annotation.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Whether the message is a user or assistant message.
    pub fn is_dialog(&self) -> bool {
        self.role.is_dialog()
    }
}

/// JSON Schema description of a tool, as offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: serde_json::Value,
}

/// Request sent to a completion client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model to use (None = client default).
    pub model: Option<String>,
    /// System prompt, supplied fresh on every call.
    pub system: Option<String>,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Tool catalog. Empty means tool use is disabled for this call.
    pub tools: Vec<ToolSchema>,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Sequences that stop generation.
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Model produced a final response.
    EndTurn,
    /// Model wants to use a tool.
    ToolUse,
    /// Hit the max_tokens limit.
    MaxTokens,
    /// Hit one of the stop sequences.
    StopSequence,
}

/// Response from a completion client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Response content blocks.
    pub content: Vec<ContentBlock>,
    /// Why the model stopped.
    pub stop_reason: StopReason,
    /// Token usage of this single exchange.
    pub usage: TokenUsage,
    /// Actual model used.
    pub model: String,
    /// Cost computed by the client (None if unknown).
    pub cost: Option<Decimal>,
}

impl CompletionResponse {
    /// Concatenated text blocks of the response.
    pub fn text(&self) -> String {
        text_of(&self.content)
    }

    /// Whether the response asks for at least one tool invocation.
    pub fn has_tool_use(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }

    /// Tool requests in the order the model emitted them.
    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        tool_requests_of(&self.content)
    }
}
