//! One-shot failover between the primary and secondary providers.
//!
//! The primary is always attempted first. If it raises while establishing
//! the call or the stream, the secondary is tried exactly once with the
//! configured fallback model, not the originally requested one. There are
//! no further retries, and a failure after streaming has begun is not
//! recovered: output already yielded to the caller cannot be replaced.

use std::sync::Arc;

use tracing::warn;

use parley_core::models::message::ChatTurn;

use crate::error::LlmError;
use crate::provider::{ChunkStream, ProviderClient, ProviderResponse};

/// Final result of a generation call, carrying the model actually used
/// (which differs from the requested model when failover occurred).
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub content: String,
    pub finish_reason: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
}

impl GenerationResult {
    fn from_response(response: ProviderResponse, model: &str) -> Self {
        Self {
            content: response.content,
            finish_reason: response.finish_reason,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            model: model.to_string(),
        }
    }
}

/// An established stream plus the model that is producing it.
pub struct StreamHandle {
    pub stream: ChunkStream,
    pub model: String,
}

/// Routes each request to the primary provider with one-shot fallback to
/// the secondary. Both clients are constructed once at process start and
/// injected here.
pub struct FailoverRouter {
    primary: Arc<dyn ProviderClient>,
    secondary: Arc<dyn ProviderClient>,
    fallback_model: String,
}

impl FailoverRouter {
    pub fn new(
        primary: Arc<dyn ProviderClient>,
        secondary: Arc<dyn ProviderClient>,
        fallback_model: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            secondary,
            fallback_model: fallback_model.into(),
        }
    }

    /// The primary client, for best-effort side tasks that should not
    /// fall back (title generation).
    pub fn primary(&self) -> Arc<dyn ProviderClient> {
        Arc::clone(&self.primary)
    }

    pub fn fallback_model(&self) -> &str {
        &self.fallback_model
    }

    /// Complete generation with failover.
    pub async fn generate(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<GenerationResult, LlmError> {
        match self.primary.generate(turns, model).await {
            Ok(response) => Ok(GenerationResult::from_response(response, model)),
            Err(err) => {
                warn!(error = %err, "primary provider failed, falling back");
                let response = self
                    .secondary
                    .generate(turns, &self.fallback_model)
                    .await?;
                Ok(GenerationResult::from_response(
                    response,
                    &self.fallback_model,
                ))
            }
        }
    }

    /// Establish a stream with failover. Failover applies only while the
    /// stream is being established; errors yielded by the returned stream
    /// itself are terminal for the request.
    pub async fn open_stream(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<StreamHandle, LlmError> {
        match self.primary.generate_stream(turns, model).await {
            Ok(stream) => Ok(StreamHandle {
                stream,
                model: model.to_string(),
            }),
            Err(err) => {
                warn!(error = %err, "primary provider failed, falling back");
                let stream = self
                    .secondary
                    .generate_stream(turns, &self.fallback_model)
                    .await?;
                Ok(StreamHandle {
                    stream,
                    model: self.fallback_model.clone(),
                })
            }
        }
    }
}
