//! In-memory message store.
//!
//! State lives in a single process-local map. Each trait call takes the
//! lock once, so individual inserts are atomic, but concurrent sends to
//! the same conversation are not serialized against each other: two
//! simultaneous requests can interleave their persisted order.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use parley_core::models::conversation::Conversation;
use parley_core::models::message::{ChatTurn, Message, Role};

use crate::error::StoreError;
use crate::{MessageExtra, MessageStore};

#[derive(Debug)]
struct ConversationEntry {
    conversation: Conversation,
    messages: Vec<Message>,
}

/// Process-local store backing the server by default.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<HashMap<Uuid, ConversationEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ConversationEntry) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let entry = inner
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound { id })?;
        Ok(f(entry))
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<String>,
        model: Option<String>,
        system_prompt: Option<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Conversation, StoreError> {
        let now = jiff::Timestamp::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title,
            model,
            system_prompt,
            metadata,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(
            conversation.id,
            ConversationEntry {
                conversation: conversation.clone(),
                messages: Vec::new(),
            },
        );

        Ok(conversation)
    }

    async fn conversation(&self, id: Uuid, user_id: &str) -> Result<Conversation, StoreError> {
        let conversation = self.with_entry(id, |entry| entry.conversation.clone())?;
        if conversation.user_id != user_id {
            return Err(StoreError::Forbidden { id });
        }
        Ok(conversation)
    }

    async fn save(
        &self,
        conversation_id: Uuid,
        role: Role,
        content: &str,
        extra: MessageExtra,
    ) -> Result<Message, StoreError> {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.to_string(),
            token_count: extra.token_count,
            model: extra.model,
            finish_reason: extra.finish_reason,
            latency_ms: extra.latency_ms,
            metadata: extra.metadata,
            created_at: jiff::Timestamp::now(),
        };

        self.with_entry(conversation_id, |entry| {
            entry.messages.push(message.clone());
        })?;

        Ok(message)
    }

    async fn history(&self, conversation_id: Uuid) -> Result<Vec<ChatTurn>, StoreError> {
        self.with_entry(conversation_id, |entry| {
            entry.messages.iter().map(Message::as_turn).collect()
        })
    }

    async fn count(&self, conversation_id: Uuid) -> Result<usize, StoreError> {
        self.with_entry(conversation_id, |entry| entry.messages.len())
    }

    async fn messages(
        &self,
        conversation_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Message>, usize), StoreError> {
        self.with_entry(conversation_id, |entry| {
            let total = entry.messages.len();
            let page = entry
                .messages
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect();
            (page, total)
        })
    }

    async fn update_title(&self, conversation_id: Uuid, title: &str) -> Result<(), StoreError> {
        self.with_entry(conversation_id, |entry| {
            entry.conversation.title = Some(title.to_string());
            entry.conversation.updated_at = jiff::Timestamp::now();
        })
    }
}
