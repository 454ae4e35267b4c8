//! The provider capability interface.
//!
//! Each client translates the canonical `{role, content}` message format to
//! its vendor's call convention and normalizes the response back into
//! [`ProviderResponse`] / [`StreamChunk`], synthesizing a `"stop"` finish
//! reason when the vendor provides none.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use parley_core::models::message::ChatTurn;
use parley_core::models::token_count::TokenCount;

use crate::error::LlmError;

/// Normalized result of a non-streaming generation call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub finish_reason: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One normalized unit of streamed output.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// A text fragment.
    Delta(String),
    /// The provider signalled the end of generation.
    Finish {
        finish_reason: String,
        usage: TokenCount,
    },
}

/// A lazy sequence of stream chunks. Terminates on finish or error; each
/// call to `generate_stream` creates a fresh, non-restartable stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send the full message list and return the complete reply.
    async fn generate(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ProviderResponse, LlmError>;

    /// Open an incremental stream for the same call. Errors raised here
    /// mean the stream was never established.
    async fn generate_stream(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ChunkStream, LlmError>;
}

const MAX_SSE_LINE_BYTES: usize = 1024 * 1024;

/// Decode a provider's SSE response body into lines.
pub(crate) fn sse_lines(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, LlmError>> {
    let bytes = response
        .bytes_stream()
        .map(|r| r.map_err(std::io::Error::other));
    FramedRead::new(
        StreamReader::new(bytes),
        LinesCodec::new_with_max_length(MAX_SSE_LINE_BYTES),
    )
    .map(|r| r.map_err(|e| LlmError::StreamTransport(e.to_string())))
}

/// Fail on non-2xx responses, capturing the body for the error message.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        body,
    })
}
