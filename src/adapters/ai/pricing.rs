//! Approximate per-token pricing used for usage accounting.

use crate::ports::ProviderId;

/// Dollars per 1K tokens for a provider and model.
pub fn rate_per_1k(provider: ProviderId, model: &str) -> f64 {
    match provider {
        ProviderId::Groq => 0.0001,
        ProviderId::OpenAI if model.contains("gpt-4") => 0.03,
        ProviderId::OpenAI => 0.002,
        ProviderId::Azure => 0.002,
    }
}

/// Estimated dollar cost of `tokens` tokens.
pub fn estimate_cost(provider: ProviderId, model: &str, tokens: u64) -> f64 {
    tokens as f64 * rate_per_1k(provider, model) / 1000.0
}
