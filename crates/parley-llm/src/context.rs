//! Context-window construction for provider calls.
//!
//! Trims conversation history to a token budget: the system prompt is
//! always present, the very first history entry is kept when it fits
//! (it anchors the assistant to the conversation's origin), and the rest
//! of the budget is filled greedily with the most recent messages.

use parley_core::models::message::{ChatTurn, Role};

use crate::tokens::{self, MESSAGE_OVERHEAD_TOKENS};

/// Default token budget, conservative enough for the smaller models.
pub const DEFAULT_MAX_TOKENS: usize = 6000;

/// Build the message list actually sent to a provider.
///
/// Scans history newest to oldest, stopping the instant the next message
/// (plus the reserved cost of the first entry) would exceed the budget.
/// The first entry is then included only if it still fits; recency wins
/// over origin. Individual messages are never truncated.
pub fn build_context(history: &[ChatTurn], system_prompt: &str, max_tokens: usize) -> Vec<ChatTurn> {
    let system = ChatTurn::new(Role::System, system_prompt);
    let system_tokens = tokens::count(system_prompt) + MESSAGE_OVERHEAD_TOKENS;

    if history.is_empty() {
        return vec![system];
    }

    let budget = max_tokens as i64 - system_tokens as i64;

    let first = history[0].clone();
    let first_tokens = (tokens::count(&first.content) + MESSAGE_OVERHEAD_TOKENS) as i64;

    // Fill from the end: most recent messages first.
    let mut recent: Vec<ChatTurn> = Vec::new();
    let mut used: i64 = 0;

    for turn in history[1..].iter().rev() {
        let turn_tokens = (tokens::count(&turn.content) + MESSAGE_OVERHEAD_TOKENS) as i64;
        if used + turn_tokens + first_tokens > budget {
            break;
        }
        recent.push(turn.clone());
        used += turn_tokens;
    }
    recent.reverse();

    let mut context = vec![system];
    if first_tokens <= budget - used {
        context.push(first);
    }
    context.extend(recent);
    context
}
