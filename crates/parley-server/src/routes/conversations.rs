use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parley_core::models::conversation::Conversation;
use parley_store::MessageStore;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub status: &'static str,
    pub data: Conversation,
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = state
        .store
        .create_conversation(&user.sub, req.title, req.model, req.system_prompt, req.metadata)
        .await?;

    Ok(Json(ConversationResponse {
        status: "success",
        data: conversation,
    }))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = state.store.conversation(conversation_id, &user.sub).await?;

    Ok(Json(ConversationResponse {
        status: "success",
        data: conversation,
    }))
}
