//! Shared test fixtures: in-process fake providers and app construction.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use parley_core::models::message::ChatTurn;
use parley_core::models::token_count::TokenCount;
use parley_llm::error::LlmError;
use parley_llm::failover::FailoverRouter;
use parley_llm::provider::{ChunkStream, ProviderClient, ProviderResponse, StreamChunk};
use parley_server::middleware::rate_limit::RateLimiter;
use parley_server::settings::Settings;
use parley_server::state::AppState;
use parley_store::memory::InMemoryStore;

/// One recorded provider call: the model plus the system-turn content.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub system: String,
}

/// Scripted provider: answers (or fails) every call and records what it
/// was asked.
pub struct FakeProvider {
    pub fail: bool,
    pub reply: String,
    pub deltas: Vec<String>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl FakeProvider {
    pub fn replying(reply: &str, deltas: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            reply: reply.to_string(),
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            reply: String::new(),
            deltas: Vec::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, turns: &[ChatTurn], model: &str) {
        let system = turns
            .first()
            .map(|t| t.content.clone())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            system,
        });
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ProviderResponse, LlmError> {
        self.record(turns, model);
        if self.fail {
            return Err(LlmError::Api {
                status: 503,
                body: "provider unavailable".to_string(),
            });
        }
        Ok(ProviderResponse {
            content: self.reply.clone(),
            finish_reason: "stop".to_string(),
            input_tokens: 12,
            output_tokens: 7,
        })
    }

    async fn generate_stream(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ChunkStream, LlmError> {
        self.record(turns, model);
        if self.fail {
            return Err(LlmError::Api {
                status: 503,
                body: "provider unavailable".to_string(),
            });
        }
        let mut chunks: Vec<Result<StreamChunk, LlmError>> = self
            .deltas
            .iter()
            .map(|d| Ok(StreamChunk::Delta(d.clone())))
            .collect();
        chunks.push(Ok(StreamChunk::Finish {
            finish_reason: "stop".to_string(),
            usage: TokenCount { input: 12, output: 7 },
        }));
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Provider whose stream is fed chunk by chunk from the test, so the test
/// controls exactly when each delta arrives.
pub struct ChannelProvider {
    stream: Mutex<Option<ChunkStream>>,
}

impl ChannelProvider {
    pub fn new() -> (Arc<Self>, mpsc::Sender<Result<StreamChunk, LlmError>>) {
        let (tx, rx) = mpsc::channel(32);
        let stream: ChunkStream = Box::pin(ReceiverStream::new(rx));
        (
            Arc::new(Self {
                stream: Mutex::new(Some(stream)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl ProviderClient for ChannelProvider {
    async fn generate(
        &self,
        _turns: &[ChatTurn],
        _model: &str,
    ) -> Result<ProviderResponse, LlmError> {
        Err(LlmError::ResponseParse(
            "channel provider only streams".to_string(),
        ))
    }

    async fn generate_stream(
        &self,
        _turns: &[ChatTurn],
        _model: &str,
    ) -> Result<ChunkStream, LlmError> {
        self.stream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| LlmError::ResponseParse("stream already consumed".to_string()))
    }
}

pub fn test_settings() -> Settings {
    Settings {
        bind_addr: "127.0.0.1:0".to_string(),
        primary_base_url: "http://unused".to_string(),
        primary_api_key: String::new(),
        secondary_base_url: "http://unused".to_string(),
        secondary_api_key: String::new(),
        default_model: "test-model".to_string(),
        fallback_model: "fallback-model".to_string(),
        token_budget: 6000,
        rate_limit_standard: 1000,
        rate_limit_ai: 1000,
    }
}

pub fn test_state(
    primary: Arc<dyn ProviderClient>,
    secondary: Arc<dyn ProviderClient>,
    settings: Settings,
) -> AppState {
    AppState {
        store: Arc::new(InMemoryStore::new()),
        llm: Arc::new(FailoverRouter::new(
            primary,
            secondary,
            settings.fallback_model.clone(),
        )),
        limiter: Arc::new(RateLimiter::new(
            settings.rate_limit_standard,
            settings.rate_limit_ai,
        )),
        settings: Arc::new(settings),
    }
}
