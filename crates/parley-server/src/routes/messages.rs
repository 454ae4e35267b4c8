//! Message endpoints: list, send, stream, events.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::Response;
use axum::{Extension, Json};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use parley_core::models::message::Message;
use parley_store::MessageStore;

use crate::error::ApiError;
use crate::generation::{self, SendMessageRequest};
use crate::middleware::auth::AuthUser;
use crate::sse;
use crate::state::AppState;

const EVENTS_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Serialize)]
pub struct MessageListResponse {
    pub status: &'static str,
    pub data: Vec<Message>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub data: Message,
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<MessageListResponse>, ApiError> {
    state.store.conversation(conversation_id, &user.sub).await?;

    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(50);
    if page < 1 {
        return Err(ApiError::BadRequest("page must be >= 1".to_string()));
    }
    if !(1..=200).contains(&per_page) {
        return Err(ApiError::BadRequest(
            "per_page must be between 1 and 200".to_string(),
        ));
    }

    let offset = (page - 1) * per_page;
    let (data, total) = state.store.messages(conversation_id, offset, per_page).await?;

    Ok(Json(MessageListResponse {
        status: "success",
        data,
        page,
        per_page,
        total,
    }))
}

/// Synchronous generation: returns the assistant message as JSON.
pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conversation = state.store.conversation(conversation_id, &user.sub).await?;
    let assistant = generation::send_message(&state, &conversation, &body).await?;

    Ok(Json(MessageResponse {
        status: "success",
        data: assistant,
    }))
}

/// Streaming generation: the SSE event stream.
///
/// The generation task runs detached from the connection; when the client
/// goes away the channel closes, the task stops forwarding and persists
/// what was already produced.
pub async fn stream(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    let conversation = state.store.conversation(conversation_id, &user.sub).await?;
    let rx = generation::start_stream(&state, &conversation, &body).await?;

    Ok(event_stream_response(rx))
}

/// Polling notification stream for externally created messages,
/// independent of generation.
pub async fn events(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.store.conversation(conversation_id, &user.sub).await?;

    let (tx, rx) = mpsc::channel::<String>(32);
    let store = state.store.clone();

    tokio::spawn(async move {
        let mut last_count = match store.count(conversation_id).await {
            Ok(count) => count,
            Err(_) => return,
        };

        loop {
            if tx.is_closed() {
                break;
            }

            let current = match store.count(conversation_id).await {
                Ok(count) => count,
                Err(_) => break,
            };

            if current > last_count {
                let Ok((new_messages, _)) = store
                    .messages(conversation_id, last_count, current - last_count)
                    .await
                else {
                    break;
                };
                for message in &new_messages {
                    if tx.send(sse::new_message(message)).await.is_err() {
                        return;
                    }
                }
                last_count = current;
            }

            tokio::time::sleep(EVENTS_POLL_INTERVAL).await;
        }
    });

    Ok(event_stream_response(rx))
}

/// Wrap a frame channel as a `text/event-stream` response body.
fn event_stream_response(rx: mpsc::Receiver<String>) -> Response {
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
