//! Generation orchestration: the path from an inbound user message to a
//! persisted assistant reply, synchronous or streamed.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use parley_core::models::conversation::Conversation;
use parley_core::models::message::{ChatTurn, Message, Role};
use parley_llm::context::build_context;
use parley_llm::failover::FailoverRouter;
use parley_llm::prompts::{build_system_prompt, TITLE_GENERATION_PROMPT};
use parley_llm::provider::{ProviderClient, StreamChunk};
use parley_llm::{pricing, tokens};
use parley_store::{MessageExtra, MessageStore};

use crate::error::ApiError;
use crate::sse;
use crate::state::AppState;

const TITLE_INPUT_MAX_CHARS: usize = 500;
const TITLE_MAX_CHARS: usize = 500;

/// Inbound generation request.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub model: Option<String>,
    #[serde(default)]
    pub thinking: bool,
}

/// Resolve the model for a request: explicit override, then the
/// conversation's model, then the service default.
fn resolve_model(state: &AppState, conversation: &Conversation, req: &SendMessageRequest) -> String {
    req.model
        .clone()
        .or_else(|| conversation.model.clone())
        .unwrap_or_else(|| state.settings.default_model.clone())
}

/// Persist the user message and fire the title task when it is the
/// conversation's very first message. Returns the built context window.
async fn prepare_context(
    state: &AppState,
    conversation: &Conversation,
    req: &SendMessageRequest,
) -> Result<Vec<ChatTurn>, ApiError> {
    state
        .store
        .save(
            conversation.id,
            Role::User,
            &req.content,
            MessageExtra {
                token_count: Some(tokens::count(&req.content) as u32),
                ..Default::default()
            },
        )
        .await?;

    // Auto-title fires iff this insert made the count exactly 1; later
    // messages never re-trigger it.
    if state.store.count(conversation.id).await? == 1 {
        spawn_title_generation(
            Arc::clone(&state.store),
            state.llm.primary(),
            state.settings.default_model.clone(),
            conversation.id,
            req.content.clone(),
        );
    }

    let system_prompt = build_system_prompt(conversation.system_prompt.as_deref(), req.thinking);
    let history = state.store.history(conversation.id).await?;
    Ok(build_context(
        &history,
        &system_prompt,
        state.settings.token_budget,
    ))
}

/// Non-streaming path: save the user message, call the provider with
/// failover, save and return the assistant message.
pub async fn send_message(
    state: &AppState,
    conversation: &Conversation,
    req: &SendMessageRequest,
) -> Result<Message, ApiError> {
    let model = resolve_model(state, conversation, req);
    let context = prepare_context(state, conversation, req).await?;

    let start = Instant::now();
    let result = state.llm.generate(&context, &model).await?;
    let latency_ms = start.elapsed().as_millis() as u64;

    let cost = pricing::log_cost(result.input_tokens, result.output_tokens, &result.model);

    let mut metadata = serde_json::Map::new();
    metadata.insert("input_tokens".to_string(), result.input_tokens.into());
    metadata.insert("estimated_cost_usd".to_string(), cost.into());

    let assistant = state
        .store
        .save(
            conversation.id,
            Role::Assistant,
            &result.content,
            MessageExtra {
                token_count: Some(result.output_tokens as u32),
                model: Some(result.model),
                finish_reason: Some(result.finish_reason),
                latency_ms: Some(latency_ms),
                metadata,
            },
        )
        .await?;

    Ok(assistant)
}

/// Streaming path setup: persists the user message and builds the context,
/// then hands off to [`stream_generation`] in a detached task. The route
/// handler wires `rx` into the response body.
pub async fn start_stream(
    state: &AppState,
    conversation: &Conversation,
    req: &SendMessageRequest,
) -> Result<mpsc::Receiver<String>, ApiError> {
    let model = resolve_model(state, conversation, req);
    let context = prepare_context(state, conversation, req).await?;

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(stream_generation(
        Arc::clone(&state.store),
        Arc::clone(&state.llm),
        conversation.id,
        context,
        model,
        tx,
    ));

    Ok(rx)
}

/// Drive one streamed generation, forwarding encoded frames into `tx`.
///
/// The caller's disconnection shows up as a closed channel and is checked
/// before each delta is forwarded: the provider stream stops being
/// consumed, the closing events are still synthesized locally, and the
/// content accumulated so far is persisted. A provider error mid-stream
/// instead emits a single terminal `error` event and persists nothing.
pub async fn stream_generation(
    store: Arc<dyn MessageStore>,
    llm: Arc<FailoverRouter>,
    conversation_id: Uuid,
    context: Vec<ChatTurn>,
    model: String,
    tx: mpsc::Sender<String>,
) {
    let message_id = Uuid::new_v4();
    let start = Instant::now();

    let _ = tx.send(sse::message_start(message_id, &model)).await;
    let _ = tx.send(sse::content_block_start()).await;

    let mut handle = match llm.open_stream(&context, &model).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "failed to establish provider stream");
            let _ = tx.send(sse::error("stream_error", &e.to_string())).await;
            return;
        }
    };

    let mut full_content = String::new();
    let mut finish_reason = "stop".to_string();
    let mut output_tokens: u64 = 0;

    while let Some(chunk) = handle.stream.next().await {
        if tx.is_closed() {
            info!(conversation_id = %conversation_id, "client disconnected during stream");
            break;
        }

        match chunk {
            Ok(StreamChunk::Delta(text)) => {
                full_content.push_str(&text);
                if tx.send(sse::content_block_delta(&text)).await.is_err() {
                    info!(conversation_id = %conversation_id, "client disconnected during stream");
                    break;
                }
            }
            Ok(StreamChunk::Finish {
                finish_reason: reason,
                usage,
            }) => {
                finish_reason = reason;
                output_tokens = usage.output;
            }
            Err(e) => {
                warn!(error = %e, "error during streaming");
                let _ = tx.send(sse::error("stream_error", &e.to_string())).await;
                return;
            }
        }
    }

    let _ = tx.send(sse::content_block_stop()).await;
    let _ = tx.send(sse::message_delta(&finish_reason, output_tokens)).await;
    let _ = tx.send(sse::message_stop()).await;

    // Whatever accumulated is saved, even after a disconnect; an aborted
    // stream with no output leaves nothing behind.
    if full_content.is_empty() {
        return;
    }

    let latency_ms = start.elapsed().as_millis() as u64;
    let token_count = if output_tokens > 0 {
        output_tokens as u32
    } else {
        tokens::count(&full_content) as u32
    };

    if let Err(e) = store
        .save(
            conversation_id,
            Role::Assistant,
            &full_content,
            MessageExtra {
                token_count: Some(token_count),
                model: Some(handle.model.clone()),
                finish_reason: Some(finish_reason),
                latency_ms: Some(latency_ms),
                metadata: serde_json::Map::new(),
            },
        )
        .await
    {
        warn!(error = %e, conversation_id = %conversation_id, "failed to persist streamed assistant message");
    }
}

/// Fire-and-forget title generation from the first user message.
///
/// Runs detached: its completion, success, or failure is never observed by
/// the originating request. Failures are logged and swallowed.
pub fn spawn_title_generation(
    store: Arc<dyn MessageStore>,
    client: Arc<dyn ProviderClient>,
    model: String,
    conversation_id: Uuid,
    user_message: String,
) {
    tokio::spawn(async move {
        let snippet: String = user_message.chars().take(TITLE_INPUT_MAX_CHARS).collect();
        let turns = vec![
            ChatTurn::new(Role::System, TITLE_GENERATION_PROMPT),
            ChatTurn::new(Role::User, snippet),
        ];

        let response = match client.generate(&turns, &model).await {
            Ok(response) => response,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "title generation failed");
                return;
            }
        };

        let title: String = response
            .content
            .trim()
            .trim_matches('"')
            .chars()
            .take(TITLE_MAX_CHARS)
            .collect();
        if title.is_empty() {
            return;
        }

        if let Err(e) = store.update_title(conversation_id, &title).await {
            warn!(conversation_id = %conversation_id, error = %e, "failed to store generated title");
        }
    });
}
