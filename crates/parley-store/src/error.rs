use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation not found: {id}")]
    ConversationNotFound { id: Uuid },

    #[error("conversation {id} does not belong to the requesting user")]
    Forbidden { id: Uuid },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
