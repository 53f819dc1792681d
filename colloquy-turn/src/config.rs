//! Generation parameters sent with every completion call.

use serde::{Deserialize, Serialize};

/// Smallest accepted `max_tokens`.
pub const MIN_MAX_TOKENS: u32 = 128;
/// Largest accepted `max_tokens`.
pub const MAX_MAX_TOKENS: u32 = 4096;

/// Sampling and length settings for one turn.
///
/// Loadable from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Model identifier (None = client default).
    pub model: Option<String>,
    /// Maximum output tokens per completion call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Sequences that stop generation.
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: 1.0,
            stop_sequences: Vec::new(),
        }
    }
}

impl GenerationParams {
    /// Clamp `max_tokens` to `[128, 4096]` and `temperature` to `[0, 1]`.
    ///
    /// A NaN temperature becomes 1.0.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_tokens = self.max_tokens.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS);
        self.temperature = if self.temperature.is_nan() {
            1.0
        } else {
            self.temperature.clamp(0.0, 1.0)
        };
        self
    }

    /// Stop generation when the model emits `marker`.
    ///
    /// Used for structured output that ends at a fixed end-of-result marker.
    #[must_use]
    pub fn with_stop_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !self.stop_sequences.contains(&marker) {
            self.stop_sequences.push(marker);
        }
        self
    }
}
