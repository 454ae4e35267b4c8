use std::env;

/// Service configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,

    /// OpenAI-compatible chat-completions endpoint (primary provider).
    pub primary_base_url: String,
    pub primary_api_key: String,

    /// Gemini-style endpoint (secondary provider).
    pub secondary_base_url: String,
    pub secondary_api_key: String,

    pub default_model: String,
    pub fallback_model: String,

    /// Token budget for context windows.
    pub token_budget: usize,

    /// Requests per user per minute, all authenticated traffic.
    pub rate_limit_standard: u32,
    /// Requests per user per minute, generation endpoints only.
    pub rate_limit_ai: u32,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("PARLEY_BIND", "0.0.0.0:8000"),
            primary_base_url: env_or("PARLEY_PRIMARY_BASE_URL", "https://api.groq.com/openai/v1"),
            primary_api_key: env_or("PARLEY_PRIMARY_API_KEY", ""),
            secondary_base_url: env_or(
                "PARLEY_SECONDARY_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            secondary_api_key: env_or("PARLEY_SECONDARY_API_KEY", ""),
            default_model: env_or("PARLEY_DEFAULT_MODEL", "llama-3.1-8b-instant"),
            fallback_model: env_or("PARLEY_FALLBACK_MODEL", "gemini-1.5-flash"),
            token_budget: env_parsed("PARLEY_TOKEN_BUDGET", 6000),
            rate_limit_standard: env_parsed("PARLEY_RATE_LIMIT_STANDARD", 60),
            rate_limit_ai: env_parsed("PARLEY_RATE_LIMIT_AI", 10),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
