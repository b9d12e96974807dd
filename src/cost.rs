//! Usage/Cost Accountant
//!
//! Converts token counts into a cost breakdown. Rates are per million tokens;
//! cache tiers are priced relative to the standard input rate.

use crate::llm::UsageStats;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Cache-write tokens cost this multiple of the input rate
pub const CACHE_WRITE_MULTIPLIER: f64 = 1.25;
/// Cache-read tokens cost this multiple of the input rate
pub const CACHE_READ_MULTIPLIER: f64 = 0.1;

const TOKENS_PER_RATE_UNIT: f64 = 1_000_000.0;

/// Per-million-token rates in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: 3.0,
            output_per_million: 15.0,
        }
    }
}

impl Pricing {
    pub fn cache_write_per_million(&self) -> f64 {
        self.input_per_million * CACHE_WRITE_MULTIPLIER
    }

    pub fn cache_read_per_million(&self) -> f64 {
        self.input_per_million * CACHE_READ_MULTIPLIER
    }
}

fn tier_cost(tokens: u64, rate_per_million: f64) -> f64 {
    tokens as f64 * rate_per_million / TOKENS_PER_RATE_UNIT
}

/// Cost of one request. `total_cost` is always `input_cost + output_cost`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    input_cost: f64,
    output_cost: f64,
    total_cost: f64,
    cache_savings: f64,
}

impl CostBreakdown {
    pub fn from_usage(usage: &UsageStats, pricing: &Pricing) -> Self {
        let input_cost = tier_cost(usage.input_tokens(), pricing.input_per_million)
            + tier_cost(usage.cache_creation_tokens(), pricing.cache_write_per_million())
            + tier_cost(usage.cache_read_tokens(), pricing.cache_read_per_million());
        let output_cost = tier_cost(usage.output_tokens(), pricing.output_per_million);

        let cache_savings = if usage.cache_read_tokens() > 0 {
            tier_cost(
                usage.cache_read_tokens(),
                pricing.input_per_million - pricing.cache_read_per_million(),
            )
        } else {
            0.0
        };

        Self {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
            cache_savings,
        }
    }

    /// Input cost across the standard, cache-write and cache-read tiers.
    pub fn input_cost(&self) -> f64 {
        self.input_cost
    }

    pub fn output_cost(&self) -> f64 {
        self.output_cost
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// What the cache-read tokens would have cost extra at the standard rate.
    pub fn cache_savings(&self) -> f64 {
        self.cache_savings
    }
}

/// Log cache behaviour for a finished request.
pub fn log_cache_activity(usage: &UsageStats, cost: &CostBreakdown) {
    if usage.cache_read_tokens() > 0 {
        info!(
            cached_tokens = usage.cache_read_tokens(),
            savings_usd = cost.cache_savings(),
            "prompt cache hit"
        );
    }
    if usage.cache_creation_tokens() > 0 {
        info!(
            cached_tokens = usage.cache_creation_tokens(),
            "prompt cache written"
        );
    }
}
