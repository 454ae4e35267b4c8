use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation record.
///
/// `model` and `system_prompt` are per-conversation overrides; when absent
/// the service-wide defaults apply. `title` starts empty and is filled in
/// by the detached title-generation task after the first user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: String,
    pub title: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub is_archived: bool,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}
