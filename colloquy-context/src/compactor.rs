//! Summarizing compactor.

use colloquy_turn::{CompletionRequest, Message, Provider, ProviderError, Role};
use serde::{Deserialize, Serialize};

/// Characters of each message kept when rendering the summarization prompt.
const RENDER_CHAR_LIMIT: usize = 500;

/// Characters of each user message kept in the local fallback summary.
const FALLBACK_SNIPPET_CHARS: usize = 50;

/// User messages quoted at most in the local fallback summary.
const FALLBACK_MAX_MESSAGES: usize = 3;

/// Fallback text when the older segment holds no user messages.
const FALLBACK_PLACEHOLDER: &str = "general questions";

/// Characters per token assumed by [`estimate_tokens`].
const CHARS_PER_TOKEN: u64 = 4;

const SUMMARY_SYSTEM_PROMPT: &str = "You write very short, plain summaries of conversations.";

/// When to compact and how much to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionThresholds {
    /// Dialog message count at which compaction fires.
    pub trigger_count: usize,
    /// Most recent dialog messages kept verbatim.
    pub keep_recent: usize,
    /// Output token cap for the generated summary.
    pub summary_max_tokens: u32,
}

impl Default for CompactionThresholds {
    fn default() -> Self {
        Self {
            trigger_count: 10,
            keep_recent: 2,
            summary_max_tokens: 150,
        }
    }
}

/// A summary of the compacted part of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// Written by the model.
    Generated(String),
    /// Built locally because the model call failed or returned nothing.
    Fallback(String),
}

impl Summary {
    /// The summary text.
    pub fn text(&self) -> &str {
        match self {
            Summary::Generated(text) | Summary::Fallback(text) => text,
        }
    }

    /// Whether the local fallback was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Summary::Fallback(_))
    }
}

/// Replaces older dialog with a model-written summary, keeping recent
/// messages verbatim.
///
/// # Example
///
/// ```ignore
/// use colloquy_context::{CompactionThresholds, HistoryCompactor};
///
/// let compactor = HistoryCompactor::new(provider, CompactionThresholds::default());
/// if compactor.should_compact(&transcript) {
///     transcript = compactor.compact(transcript).await;
/// }
/// ```
pub struct HistoryCompactor<P: Provider> {
    provider: P,
    thresholds: CompactionThresholds,
    model: Option<String>,
}

impl<P: Provider> HistoryCompactor<P> {
    /// Creates a compactor that summarizes through `provider`.
    #[must_use]
    pub fn new(provider: P, thresholds: CompactionThresholds) -> Self {
        Self {
            provider,
            thresholds,
            model: None,
        }
    }

    /// Summarize with a specific model instead of the client default.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The configured thresholds.
    pub fn thresholds(&self) -> &CompactionThresholds {
        &self.thresholds
    }

    /// Whether the transcript holds at least `trigger_count` dialog messages
    /// and compacting it would make it shorter.
    pub fn should_compact(&self, transcript: &[Message]) -> bool {
        let count = transcript.iter().filter(|m| m.is_dialog()).count();
        let fire = count >= self.thresholds.trigger_count
            && shrinks(count, self.thresholds.keep_recent);
        if fire {
            tracing::info!(
                count,
                trigger = self.thresholds.trigger_count,
                "transcript needs compaction"
            );
        }
        fire
    }

    /// Compact keeping the configured number of recent messages.
    pub async fn compact(&self, transcript: Vec<Message>) -> Vec<Message> {
        let keep_recent = self.thresholds.keep_recent;
        self.compact_keeping(transcript, keep_recent).await
    }

    /// Compact keeping the last `keep_recent` dialog messages verbatim.
    ///
    /// Returns the input untouched unless at least two dialog messages are
    /// older than the kept tail. Otherwise returns one summary message
    /// followed by the kept tail; non-dialog messages are dropped.
    pub async fn compact_keeping(
        &self,
        transcript: Vec<Message>,
        keep_recent: usize,
    ) -> Vec<Message> {
        let dialog_len = transcript.iter().filter(|m| m.is_dialog()).count();
        if !shrinks(dialog_len, keep_recent) {
            tracing::debug!(dialog_len, keep_recent, "nothing to compact");
            return transcript;
        }

        let before = transcript.len();
        let mut dialog: Vec<Message> =
            transcript.into_iter().filter(Message::is_dialog).collect();
        let recent = dialog.split_off(dialog_len - keep_recent);
        let older = dialog;

        tracing::info!(older = older.len(), recent = recent.len(), "compacting transcript");

        let summary = self.summarize(&older).await;

        let mut compacted = Vec::with_capacity(recent.len() + 1);
        compacted.push(summary_message(&summary));
        compacted.extend(recent);

        tracing::info!(
            before,
            after = compacted.len(),
            fallback = summary.is_fallback(),
            "transcript compacted"
        );
        compacted
    }

    /// Summarize `older`, falling back to a local summary on any failure.
    pub async fn summarize(&self, older: &[Message]) -> Summary {
        match self.generate_summary(older).await {
            Ok(text) => Summary::Generated(text),
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed, using local fallback");
                Summary::Fallback(fallback_summary(older))
            }
        }
    }

    /// Ask the model for a summary. A blank answer counts as a failure.
    async fn generate_summary(&self, older: &[Message]) -> Result<String, ProviderError> {
        let request = summary_request(
            older,
            self.thresholds.summary_max_tokens,
            self.model.clone(),
        );
        let response = self.provider.complete(request).await?;
        let text = response.text().trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::Protocol("empty summary".into()));
        }
        Ok(text)
    }
}

/// Replacing the older segment with one summary message shortens the dialog
/// only when that segment holds two or more messages.
fn shrinks(dialog_len: usize, keep_recent: usize) -> bool {
    dialog_len >= keep_recent.saturating_add(2)
}

/// Build the single-shot, zero-temperature summarization request.
pub fn summary_request(
    older: &[Message],
    max_tokens: u32,
    model: Option<String>,
) -> CompletionRequest {
    let prompt = format!(
        "Write a VERY short summary of the dialog (2-3 sentences at most).\n\
         Name only the key topics that were discussed. No details, no formatting.\n\n\
         Dialog:\n{}\n\n\
         SHORT summary (2-3 sentences):",
        render_conversation(older)
    );
    CompletionRequest {
        model,
        system: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
        messages: vec![Message::user(prompt)],
        tools: Vec::new(),
        max_tokens,
        temperature: 0.0,
        stop_sequences: Vec::new(),
    }
}

/// Render messages as `[n] Role: content`, one per paragraph.
///
/// Numbering starts at 1; content longer than 500 characters is cut and
/// marked with `...`.
pub fn render_conversation(messages: &[Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let label = match message.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            let text = message.content.plain_text();
            let content = if text.chars().count() > RENDER_CHAR_LIMIT {
                let cut: String = text.chars().take(RENDER_CHAR_LIMIT).collect();
                format!("{cut}...")
            } else {
                text
            };
            format!("[{}] {label}: {content}", index + 1)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Deterministic summary built without the model.
///
/// Joins the first 50 characters of up to three user messages with commas.
pub fn fallback_summary(messages: &[Message]) -> String {
    let snippets: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .take(FALLBACK_MAX_MESSAGES)
        .map(|m| m.content.plain_text().chars().take(FALLBACK_SNIPPET_CHARS).collect())
        .collect();

    if snippets.is_empty() {
        FALLBACK_PLACEHOLDER.to_string()
    } else {
        snippets.join(", ")
    }
}

/// Rough token count of the dialog messages, at four characters per token.
pub fn estimate_tokens(messages: &[Message]) -> u64 {
    let chars: usize = messages
        .iter()
        .filter(|m| m.is_dialog())
        .map(|m| m.content.plain_text().chars().count())
        .sum();
    chars as u64 / CHARS_PER_TOKEN
}

/// The synthetic user message that stands in for the compacted history.
pub fn summary_message(summary: &Summary) -> Message {
    Message::user(format!("[Earlier discussion: {}]", summary.text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_numbers_and_labels() {
        let rendered = render_conversation(&[Message::user("hi"), Message::assistant("hello")]);
        assert_eq!(rendered, "[1] User: hi\n\n[2] Assistant: hello");
    }

    #[test]
    fn render_truncates_long_content() {
        let long = "x".repeat(600);
        let rendered = render_conversation(&[Message::user(long)]);
        assert_eq!(rendered, format!("[1] User: {}...", "x".repeat(500)));
    }

    #[test]
    fn render_counts_characters_not_bytes() {
        let text = "é".repeat(500);
        let rendered = render_conversation(&[Message::user(text.clone())]);
        assert_eq!(rendered, format!("[1] User: {text}"));
    }

    #[test]
    fn fallback_uses_three_user_snippets() {
        let messages = vec![
            Message::user("a".repeat(80)),
            Message::assistant("ignored"),
            Message::user("second question"),
            Message::user("third question"),
            Message::user("fourth question"),
        ];
        assert_eq!(
            fallback_summary(&messages),
            format!("{}, second question, third question", "a".repeat(50))
        );
    }

    #[test]
    fn fallback_placeholder_without_user_messages() {
        assert_eq!(
            fallback_summary(&[Message::assistant("only me")]),
            "general questions"
        );
        assert_eq!(fallback_summary(&[]), "general questions");
    }

    #[test]
    fn summary_message_frames_text() {
        let message = summary_message(&Summary::Generated("We talked about rain.".into()));
        assert_eq!(message.role, Role::User);
        assert_eq!(
            message.content.as_text(),
            Some("[Earlier discussion: We talked about rain.]")
        );
    }

    #[test]
    fn summary_request_is_deterministic_and_toolless() {
        let request = summary_request(&[Message::user("hi")], 150, None);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.max_tokens, 150);
        assert!(request.tools.is_empty());
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].content.plain_text().contains("[1] User: hi"));
    }

    #[test]
    fn estimate_counts_dialog_characters() {
        let messages = vec![
            Message::new(Role::System, "ignored system text"),
            Message::user("x".repeat(10)),
            Message::assistant("é".repeat(6)),
        ];
        assert_eq!(estimate_tokens(&messages), 4);
        assert_eq!(estimate_tokens(&[]), 0);
    }

    #[test]
    fn thresholds_default() {
        let t = CompactionThresholds::default();
        assert_eq!((t.trigger_count, t.keep_recent, t.summary_max_tokens), (10, 2, 150));
    }

    #[test]
    fn thresholds_load_with_missing_fields() {
        let t: CompactionThresholds = serde_json::from_str(r#"{"keep_recent": 4}"#).unwrap();
        assert_eq!((t.trigger_count, t.keep_recent, t.summary_max_tokens), (10, 4, 150));
    }
}
