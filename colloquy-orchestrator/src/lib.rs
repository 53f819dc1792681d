#![deny(missing_docs)]
//! Turn orchestrator: model + tools in a bounded loop.
//!
//! One turn takes a transcript and a new user message, calls the model,
//! resolves any tool requests through the [`ToolRegistry`], feeds the
//! results back and repeats until the model answers without tools or the
//! round limit is reached.
//!
//! The orchestrator never persists anything. The caller owns the transcript
//! and decides what to store once the turn succeeds.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use colloquy_tool::{ToolContext, ToolError, ToolRegistry};
use colloquy_turn::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, GenerationParams, Message,
    Provider, ProviderError, Role, TokenUsage, ToolRequest, ToolSchema,
};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static configuration for a [`TurnOrchestrator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum tool-resolution rounds per turn. The model gets one more
    /// call after the last round; tools it requests then are not run.
    pub max_rounds: u32,
    /// Run the tool requests of one round concurrently.
    pub parallel_tool_execution: bool,
    /// Reply used when the model ends a tool-using turn with no text.
    pub empty_reply_placeholder: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            parallel_tool_execution: false,
            empty_reply_placeholder: None,
        }
    }
}

/// Everything one turn needs.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    /// System prompt sent with every call. Blank means none.
    pub system_prompt: String,
    /// Prior conversation. Only non-blank user/assistant messages are sent.
    pub transcript: Vec<Message>,
    /// The new user message.
    pub user_message: String,
    /// Generation settings; normalized before use.
    pub params: GenerationParams,
    /// Tool catalog for this turn. Empty disables tool use.
    pub tools: Vec<ToolSchema>,
    /// Session the turn belongs to, handed to tools.
    pub session_id: Option<String>,
}

impl TurnInput {
    /// Input with the given user message and defaults elsewhere.
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Default::default()
        }
    }
}

/// Why the turn ended.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The model answered without requesting tools.
    Complete,
    /// The round limit was reached while the model still wanted tools.
    RoundLimit,
}

/// One tool invocation made during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    /// Tool name as requested by the model.
    pub name: String,
    /// Wall-clock time spent in the tool.
    pub duration: Duration,
    /// Whether the tool returned a result.
    pub success: bool,
}

/// Result of a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    /// Final assistant text. May be empty after a round limit.
    pub reply: String,
    /// Tokens summed over every round.
    pub usage: TokenUsage,
    /// Cost summed over every round the client priced.
    pub cost: Decimal,
    /// Completion calls made.
    pub rounds: u32,
    /// Why the turn ended.
    pub exit_reason: ExitReason,
    /// Tool calls in the order their results were sent back.
    pub tool_calls: Vec<ToolCallRecord>,
}

/// A turn that could not produce a reply.
///
/// Usage consumed before the failure is not reported.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// The completion client failed.
    #[error("completion failed in round {round}: {source}")]
    Provider {
        /// Round (1-based) whose call failed.
        round: u32,
        /// The client error.
        #[source]
        source: ProviderError,
    },
}

impl TurnError {
    /// Whether running the same turn again later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TurnError::Provider { source, .. } => source.is_retryable(),
        }
    }

    /// Delay suggested by the service, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TurnError::Provider { source, .. } => source.retry_after(),
        }
    }

    /// The underlying client error.
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            TurnError::Provider { source, .. } => source,
        }
    }
}

/// Outcome of one tool request.
struct ToolOutcome {
    block: ContentBlock,
    record: ToolCallRecord,
    output: Option<String>,
}

/// Runs turns against a completion client and a tool registry.
///
/// Generic over `P: Provider`; share one client between several consumers
/// by wrapping it in an `Arc`.
pub struct TurnOrchestrator<P: Provider> {
    provider: P,
    tools: ToolRegistry,
    config: OrchestratorConfig,
}

impl<P: Provider> TurnOrchestrator<P> {
    /// Create an orchestrator.
    pub fn new(provider: P, tools: ToolRegistry, config: OrchestratorConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// The tool registry.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one turn to completion.
    pub async fn run_turn(&self, input: TurnInput) -> Result<TurnOutput, TurnError> {
        let TurnInput {
            system_prompt,
            transcript,
            user_message,
            params,
            tools,
            session_id,
        } = input;

        let params = params.normalized();
        let system = if system_prompt.trim().is_empty() {
            None
        } else {
            Some(system_prompt)
        };
        let max_rounds = self.config.max_rounds;
        let allowed: HashSet<String> = tools.iter().map(|t| t.name.clone()).collect();

        let mut messages = working_messages(transcript, user_message);
        let mut ctx = ToolContext {
            session_id,
            ..Default::default()
        };
        let mut usage = TokenUsage::default();
        let mut cost = Decimal::ZERO;
        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();
        let mut round: u32 = 0;
        let mut tool_rounds: u32 = 0;

        loop {
            round += 1;
            tracing::debug!(
                round,
                messages = messages.len(),
                tools = tools.len(),
                "sending completion request"
            );

            let request = CompletionRequest {
                model: params.model.clone(),
                system: system.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                max_tokens: params.max_tokens,
                temperature: params.temperature,
                stop_sequences: params.stop_sequences.clone(),
            };

            let response = self
                .provider
                .complete(request)
                .await
                .map_err(|source| {
                    tracing::warn!(
                        round,
                        error = %source,
                        retryable = source.is_retryable(),
                        "completion failed"
                    );
                    TurnError::Provider { round, source }
                })?;

            usage = usage.accumulate(response.usage);
            if let Some(c) = response.cost {
                cost += c;
            }

            let requests = if tools.is_empty() {
                Vec::new()
            } else {
                response.tool_requests()
            };

            if requests.is_empty() {
                let reply = self.final_reply(&response, !tool_calls.is_empty());
                tracing::info!(
                    rounds = round,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "turn complete"
                );
                return Ok(TurnOutput {
                    reply,
                    usage,
                    cost,
                    rounds: round,
                    exit_reason: ExitReason::Complete,
                    tool_calls,
                });
            }

            if tool_rounds >= max_rounds {
                tracing::warn!(
                    rounds = round,
                    tool_rounds,
                    pending = requests.len(),
                    "round limit reached"
                );
                return Ok(TurnOutput {
                    reply: response.text(),
                    usage,
                    cost,
                    rounds: round,
                    exit_reason: ExitReason::RoundLimit,
                    tool_calls,
                });
            }

            messages.push(Message::new(
                Role::Assistant,
                Content::Blocks(response.content.clone()),
            ));

            let outcomes = if self.config.parallel_tool_execution && requests.len() > 1 {
                let futs = requests
                    .iter()
                    .map(|req| self.execute_tool(req, &allowed, &ctx));
                let outcomes = join_all(futs).await;
                for (req, outcome) in requests.iter().zip(&outcomes) {
                    if let Some(output) = &outcome.output {
                        ctx.prior_results.insert(req.name.clone(), output.clone());
                    }
                }
                outcomes
            } else {
                let mut outcomes = Vec::with_capacity(requests.len());
                for req in &requests {
                    let outcome = self.execute_tool(req, &allowed, &ctx).await;
                    if let Some(output) = &outcome.output {
                        ctx.prior_results.insert(req.name.clone(), output.clone());
                    }
                    outcomes.push(outcome);
                }
                outcomes
            };

            let mut results = Vec::with_capacity(outcomes.len());
            for outcome in outcomes {
                tool_calls.push(outcome.record);
                results.push(outcome.block);
            }

            messages.push(Message::new(Role::User, Content::Blocks(results)));
            tool_rounds += 1;
        }
    }

    async fn execute_tool(
        &self,
        req: &ToolRequest,
        allowed: &HashSet<String>,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let start = Instant::now();
        let result = if allowed.contains(&req.name) {
            self.tools.invoke(&req.name, req.input.clone(), ctx).await
        } else {
            Err(ToolError::NotFound(req.name.clone()))
        };
        let duration = start.elapsed();
        let success = result.is_ok();

        tracing::info!(tool = %req.name, ?duration, success, "tool call finished");

        let (content, is_error, output) = match result {
            Ok(text) => (text.clone(), false, Some(text)),
            Err(e) => (e.to_string(), true, None),
        };

        ToolOutcome {
            block: ContentBlock::ToolResult {
                tool_use_id: req.id.clone(),
                content,
                is_error,
            },
            record: ToolCallRecord {
                name: req.name.clone(),
                duration,
                success,
            },
            output,
        }
    }

    fn final_reply(&self, response: &CompletionResponse, used_tools: bool) -> String {
        let text = response.text();
        match &self.config.empty_reply_placeholder {
            Some(placeholder) if used_tools && text.trim().is_empty() => placeholder.clone(),
            _ => text,
        }
    }
}

/// The messages sent in the first round: non-blank dialog from the
/// transcript followed by the new user message.
pub fn working_messages(transcript: Vec<Message>, user_message: String) -> Vec<Message> {
    let mut messages: Vec<Message> = transcript
        .into_iter()
        .filter(|m| m.is_dialog() && !m.content.is_blank())
        .collect();
    messages.push(Message::user(user_message));
    messages
}
