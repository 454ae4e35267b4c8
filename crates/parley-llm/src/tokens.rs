//! Approximate token counting.
//!
//! Uses the cl100k_base encoding as a reasonable approximation for every
//! model the service talks to; the counter is shared across providers and
//! is a heuristic, not an exact accountant for any one vendor.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use parley_core::models::message::ChatTurn;

/// Fixed per-message overhead for role/formatting tokens.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Fixed priming cost for the expected reply.
pub const REPLY_PRIMING_TOKENS: usize = 2;

fn encoding() -> &'static CoreBPE {
    static ENCODING: OnceLock<CoreBPE> = OnceLock::new();
    ENCODING.get_or_init(|| {
        tiktoken_rs::cl100k_base().expect("cl100k_base tables are bundled with the crate")
    })
}

/// Count the tokens in a text string.
pub fn count(text: &str) -> usize {
    encoding().encode_ordinary(text).len()
}

/// Count the tokens of a full message list as a provider would bill it:
/// per message, the content and role plus the fixed overhead, plus the
/// reply priming constant.
pub fn count_turns(turns: &[ChatTurn]) -> usize {
    let mut total = 0;
    for turn in turns {
        total += MESSAGE_OVERHEAD_TOKENS;
        total += count(&turn.content);
        total += count(turn.role.as_str());
    }
    total + REPLY_PRIMING_TOKENS
}
