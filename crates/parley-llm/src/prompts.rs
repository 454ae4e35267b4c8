//! System prompt templates.

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, concise AI assistant. \
    Provide clear, well-structured responses. \
    When appropriate, use markdown formatting for readability. \
    If you're unsure about something, say so rather than guessing.";

pub const TITLE_GENERATION_PROMPT: &str = "Generate a concise title (max 8 words) \
    for a conversation that starts with the following message. \
    Return ONLY the title text, nothing else.";

pub const THINKING_PROMPT_PREFIX: &str = "Think step by step. Show your reasoning \
    in <thinking> tags before giving your final answer.\n\n";

/// Assemble the system prompt for a generation call.
///
/// A per-conversation custom prompt overrides the default; the thinking
/// preamble is prepended when the request asks for a reasoning trace.
pub fn build_system_prompt(custom_prompt: Option<&str>, thinking: bool) -> String {
    let base = custom_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT);
    if thinking {
        format!("{THINKING_PROMPT_PREFIX}{base}")
    } else {
        base.to_string()
    }
}
