pub mod conversation;
pub mod cost;
pub mod message;
pub mod token_count;
