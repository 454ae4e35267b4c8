//! Per-call cost estimation.

use tracing::info;

use parley_core::models::cost::ModelPricing;
use parley_core::models::token_count::TokenCount;

/// Known model pricing (USD per 1K tokens). Approximate; updated as
/// provider price sheets change.
pub fn pricing_for(model: &str) -> ModelPricing {
    match model {
        "llama-3.1-8b-instant" => ModelPricing {
            input_per_thousand: 0.00005,
            output_per_thousand: 0.00008,
        },
        "llama-3.1-70b-versatile" | "llama-3.3-70b-versatile" => ModelPricing {
            input_per_thousand: 0.00059,
            output_per_thousand: 0.00079,
        },
        "mixtral-8x7b-32768" => ModelPricing {
            input_per_thousand: 0.00024,
            output_per_thousand: 0.00024,
        },
        "gemma2-9b-it" => ModelPricing {
            input_per_thousand: 0.0002,
            output_per_thousand: 0.0002,
        },
        "gemini-1.5-flash" => ModelPricing {
            input_per_thousand: 0.000075,
            output_per_thousand: 0.0003,
        },
        "gemini-1.5-pro" => ModelPricing {
            input_per_thousand: 0.00125,
            output_per_thousand: 0.005,
        },
        // Fallback pricing for unknown models.
        _ => ModelPricing {
            input_per_thousand: 0.0005,
            output_per_thousand: 0.001,
        },
    }
}

/// Estimate the cost in USD of a single call.
pub fn estimate_cost(input_tokens: u64, output_tokens: u64, model: &str) -> f64 {
    pricing_for(model).estimate_cost(TokenCount {
        input: input_tokens,
        output: output_tokens,
    })
}

/// Estimate and log the cost of a completed call.
pub fn log_cost(input_tokens: u64, output_tokens: u64, model: &str) -> f64 {
    let cost = estimate_cost(input_tokens, output_tokens, model);
    info!(
        model,
        input_tokens, output_tokens, cost_usd = cost, "llm call cost"
    );
    cost
}
