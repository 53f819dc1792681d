//! Per-model token pricing.
//!
//! Rates are USD per million tokens. Unknown models have no price.

use colloquy_turn::TokenUsage;
use rust_decimal::Decimal;

/// Input and output rate for one model family, in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    /// Price of one million input tokens.
    pub input_per_million: Decimal,
    /// Price of one million output tokens.
    pub output_per_million: Decimal,
}

impl Rates {
    fn new(input_cents: i64, output_cents: i64) -> Self {
        Self {
            input_per_million: Decimal::new(input_cents, 2),
            output_per_million: Decimal::new(output_cents, 2),
        }
    }
}

/// Look up rates by model family.
pub fn rates(model: &str) -> Option<Rates> {
    let lower = model.to_lowercase();

    if lower.contains("opus-4-5") || lower.contains("opus-4.5") {
        return Some(Rates::new(500, 2500));
    }
    if lower.contains("opus") {
        return Some(Rates::new(1500, 7500));
    }
    if lower.contains("sonnet") {
        return Some(Rates::new(300, 1500));
    }
    if lower.contains("haiku-4-5") || lower.contains("haiku-4.5") {
        return Some(Rates::new(100, 500));
    }
    if lower.contains("3-5-haiku") {
        return Some(Rates::new(80, 400));
    }
    if lower.contains("haiku") {
        return Some(Rates::new(25, 125));
    }
    None
}

/// Cost of one exchange, or `None` when the model is not priced.
pub fn cost(model: &str, usage: &TokenUsage) -> Option<Decimal> {
    let rates = rates(model)?;
    let million = Decimal::from(1_000_000u64);
    let input = Decimal::from(usage.input_tokens) * rates.input_per_million;
    let output = Decimal::from(usage.output_tokens) * rates.output_per_million;
    Some((input + output) / million)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sonnet_cost() {
        let cost = cost("claude-sonnet-4-20250514", &TokenUsage::new(1_000_000, 100_000)).unwrap();
        assert_eq!(cost, Decimal::new(450, 2));
    }

    #[test]
    fn small_usage_is_exact() {
        let cost = cost("claude-3-haiku-20240307", &TokenUsage::new(1000, 1000)).unwrap();
        assert_eq!(cost, Decimal::new(150, 5));
    }

    #[test]
    fn family_matching() {
        assert_eq!(rates("claude-opus-4-20250514"), Some(Rates::new(1500, 7500)));
        assert_eq!(rates("claude-opus-4-5"), Some(Rates::new(500, 2500)));
        assert_eq!(rates("claude-3-5-haiku-20241022"), Some(Rates::new(80, 400)));
        assert_eq!(rates("claude-haiku-4-5"), Some(Rates::new(100, 500)));
    }

    #[test]
    fn unknown_model_has_no_cost() {
        assert_eq!(cost("mystery-model", &TokenUsage::new(10, 10)), None);
    }
}
