use serde::{Deserialize, Serialize};

use super::token_count::TokenCount;

/// Pricing per thousand tokens for a provider model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_thousand: f64,
    pub output_per_thousand: f64,
}

impl ModelPricing {
    /// Estimate the cost in USD for a token count, rounded to 8 decimals.
    pub fn estimate_cost(&self, tokens: TokenCount) -> f64 {
        let cost = (tokens.input as f64 / 1000.0) * self.input_per_thousand
            + (tokens.output as f64 / 1000.0) * self.output_per_thousand;
        (cost * 1e8).round() / 1e8
    }
}
