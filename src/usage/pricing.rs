use serde::{Deserialize, Serialize};

use super::types::TokenCounts;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Prices in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSchedule {
    pub input: f64,
    pub output: f64,
    pub cache_creation: f64,
    pub cache_read: f64,
}

impl PriceSchedule {
    /// Opus 4.5 is cheaper than the older Opus generations.
    pub const OPUS_4_5: Self = Self {
        input: 5.0,
        output: 25.0,
        cache_creation: 6.25,
        cache_read: 0.50,
    };
    pub const OPUS: Self = Self {
        input: 15.0,
        output: 75.0,
        cache_creation: 18.75,
        cache_read: 1.50,
    };
    pub const SONNET: Self = Self {
        input: 3.0,
        output: 15.0,
        cache_creation: 3.75,
        cache_read: 0.30,
    };
    pub const HAIKU: Self = Self {
        input: 1.0,
        output: 5.0,
        cache_creation: 1.25,
        cache_read: 0.10,
    };

    pub fn cost(&self, tokens: &TokenCounts) -> f64 {
        (tokens.input as f64 * self.input
            + tokens.output as f64 * self.output
            + tokens.cache_creation as f64 * self.cache_creation
            + tokens.cache_read as f64 * self.cache_read)
            / TOKENS_PER_MILLION
    }
}

/// What to charge for a model id that matches no known family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownModelPolicy {
    /// Price as Sonnet. Future model names get silently mis-priced; that is
    /// the accepted tradeoff for never showing a zero cost for real usage.
    #[default]
    Sonnet,
    /// Leave the cost at zero and flag the breakdown as unpriced.
    Unpriced,
}

/// Maps model ids to price schedules by case-insensitive substring match.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingTable {
    unknown_models: UnknownModelPolicy,
}

impl PricingTable {
    pub fn new(unknown_models: UnknownModelPolicy) -> Self {
        Self { unknown_models }
    }

    /// Match a model id against the known families, most specific first.
    pub fn known_schedule(model: &str) -> Option<PriceSchedule> {
        let lower = model.to_lowercase();
        if lower.contains("opus-4-5") || lower.contains("opus-4.5") {
            Some(PriceSchedule::OPUS_4_5)
        } else if lower.contains("opus") {
            Some(PriceSchedule::OPUS)
        } else if lower.contains("sonnet") {
            Some(PriceSchedule::SONNET)
        } else if lower.contains("haiku") {
            Some(PriceSchedule::HAIKU)
        } else {
            None
        }
    }

    /// Schedule for a model id after applying the unknown-model policy.
    pub fn schedule_for(&self, model: &str) -> Option<PriceSchedule> {
        Self::known_schedule(model).or(match self.unknown_models {
            UnknownModelPolicy::Sonnet => Some(PriceSchedule::SONNET),
            UnknownModelPolicy::Unpriced => None,
        })
    }

    /// Cost of a set of token sums, or `None` when the model is left unpriced.
    pub fn calculate_cost(&self, model: &str, tokens: &TokenCounts) -> Option<f64> {
        self.schedule_for(model).map(|schedule| schedule.cost(tokens))
    }
}
