//! parley-core
//!
//! Pure domain types: messages, conversations, token accounting.
//! No HTTP or provider dependency; this is the shared vocabulary of the
//! Parley system.

pub mod error;
pub mod models;
