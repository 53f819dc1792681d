//! Request/response mapping between colloquy types and the Anthropic Messages API format.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages>

use colloquy_turn::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, Message, ProviderError, Role,
    StopReason, TokenUsage, ToolSchema,
};

use crate::pricing;
use crate::types::{
    ApiBlock, ApiContent, ApiMessage, ApiRequest, ApiResponse, ApiResponseBlock, ApiTool,
};

// ─── Request mapping ─────────────────────────────────────────────────────────

/// Convert a [`CompletionRequest`] into the Anthropic Messages API body.
///
/// The `tools` key is omitted entirely when the catalog is empty.
#[must_use]
pub fn to_api_request<'a>(
    req: &'a CompletionRequest,
    default_model: &'a str,
) -> ApiRequest<'a> {
    let model = match req.model.as_deref() {
        Some(model) if !model.is_empty() => model,
        _ => default_model,
    };

    ApiRequest {
        model,
        messages: map_messages(&req.messages),
        max_tokens: req.max_tokens,
        temperature: req.temperature,
        system: req.system.as_deref().filter(|s| !s.trim().is_empty()),
        stop_sequences: (!req.stop_sequences.is_empty()).then_some(req.stop_sequences.as_slice()),
        tools: req.tools.iter().map(map_tool_schema).collect(),
    }
}

/// Map messages to Anthropic's array format. System messages are dropped;
/// the system prompt travels in the top-level `system` field.
fn map_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .filter(|msg| msg.role != Role::System)
        .map(|msg| ApiMessage {
            role: msg.role.as_str(),
            content: map_content(&msg.content),
        })
        .collect()
}

fn map_content(content: &Content) -> ApiContent<'_> {
    match content {
        Content::Text(text) => ApiContent::Text(text),
        Content::Blocks(blocks) => {
            ApiContent::Blocks(blocks.iter().map(map_content_block).collect())
        }
    }
}

/// Map a single [`ContentBlock`] to its Anthropic wire form.
fn map_content_block(block: &ContentBlock) -> ApiBlock<'_> {
    match block {
        ContentBlock::Text { text } => ApiBlock::Text { text },
        ContentBlock::ToolUse { id, name, input } => ApiBlock::ToolUse { id, name, input },
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => ApiBlock::ToolResult {
            tool_use_id,
            content,
            is_error: *is_error,
        },
    }
}

fn map_tool_schema(tool: &ToolSchema) -> ApiTool<'_> {
    ApiTool {
        name: &tool.name,
        description: &tool.description,
        input_schema: &tool.input_schema,
    }
}

// ─── Response mapping ────────────────────────────────────────────────────────

/// Parse an Anthropic Messages API response body into a [`CompletionResponse`].
///
/// Cost is filled in from the pricing table when the model is known.
///
/// # Errors
///
/// [`ProviderError::Protocol`] if the body is not JSON or required fields
/// are missing or malformed.
pub fn from_api_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Protocol(format!("invalid response body: {e}")))?;

    let content: Vec<ContentBlock> = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ApiResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
            ApiResponseBlock::ToolUse { id, name, input } => {
                Some(ContentBlock::ToolUse { id, name, input })
            }
            ApiResponseBlock::Unsupported => {
                tracing::debug!("skipping unsupported content block");
                None
            }
        })
        .collect();

    let usage = TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens);
    let stop_reason = response
        .stop_reason
        .as_deref()
        .map(parse_stop_reason)
        .unwrap_or(StopReason::EndTurn);
    let cost = pricing::cost(&response.model, &usage);

    Ok(CompletionResponse {
        content,
        stop_reason,
        usage,
        model: response.model,
        cost,
    })
}

fn parse_stop_reason(reason: &str) -> StopReason {
    match reason {
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}
