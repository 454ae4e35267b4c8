//! parley-store
//!
//! The Message Store collaborator: a narrow persistence interface for
//! conversations and messages, plus the in-memory implementation the server
//! and the test suites run against. Durable backends plug in behind the
//! same trait.

use async_trait::async_trait;
use uuid::Uuid;

use parley_core::models::conversation::Conversation;
use parley_core::models::message::{ChatTurn, Message, Role};

pub mod error;
pub mod memory;

use error::StoreError;

/// Extra fields recorded alongside a message at save time.
///
/// User messages carry only a token count; assistant messages also record
/// the model used, finish reason, latency and free-form metadata.
#[derive(Debug, Clone, Default)]
pub struct MessageExtra {
    pub token_count: Option<u32>,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
    pub latency_ms: Option<u64>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Persistence interface consumed by the generation pipeline.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<String>,
        model: Option<String>,
        system_prompt: Option<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Conversation, StoreError>;

    /// Fetch a conversation, verifying it belongs to `user_id`.
    ///
    /// Returns `ConversationNotFound` for unknown ids and `Forbidden` when
    /// the conversation belongs to a different user.
    async fn conversation(&self, id: Uuid, user_id: &str) -> Result<Conversation, StoreError>;

    /// Append a message to a conversation.
    async fn save(
        &self,
        conversation_id: Uuid,
        role: Role,
        content: &str,
        extra: MessageExtra,
    ) -> Result<Message, StoreError>;

    /// Full `{role, content}` history of a conversation in chronological
    /// order.
    async fn history(&self, conversation_id: Uuid) -> Result<Vec<ChatTurn>, StoreError>;

    /// Number of persisted messages in a conversation.
    async fn count(&self, conversation_id: Uuid) -> Result<usize, StoreError>;

    /// A page of messages in chronological order, plus the total count.
    async fn messages(
        &self,
        conversation_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Message>, usize), StoreError>;

    async fn update_title(&self, conversation_id: Uuid, title: &str) -> Result<(), StoreError>;
}
