//! Primary provider: an OpenAI-compatible chat-completions endpoint.
//!
//! Speaks `POST {base_url}/chat/completions`, both blocking and with
//! `stream: true`, where the streamed body is SSE `data:` lines ending in
//! a `[DONE]` marker.

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use parley_core::models::message::ChatTurn;
use parley_core::models::token_count::TokenCount;

use crate::error::LlmError;
use crate::provider::{
    check_status, sse_lines, ChunkStream, ProviderClient, ProviderResponse, StreamChunk,
};

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn post_completions(
        &self,
        turns: &[ChatTurn],
        model: &str,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&ChatCompletionRequest {
                model,
                messages: turns,
                stream,
            })
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl ProviderClient for OpenAiCompatClient {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ProviderResponse, LlmError> {
        let response = self.post_completions(turns, model, false).await?;
        let body: ChatCompletionResponse = response.json().await?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseParse("no choices in response".to_string()))?;

        let usage = body.usage.unwrap_or_default();

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }

    async fn generate_stream(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ChunkStream, LlmError> {
        let response = self.post_completions(turns, model, true).await?;
        let chunks = sse_lines(response).flat_map(|line| stream::iter(parse_stream_line(line)));
        Ok(Box::pin(chunks))
    }
}

/// Map one SSE line to zero or more chunks. A chunk line can carry both a
/// content delta and a finish reason; the delta is yielded first.
fn parse_stream_line(line: Result<String, LlmError>) -> Vec<Result<StreamChunk, LlmError>> {
    let line = match line {
        Ok(line) => line,
        Err(e) => return vec![Err(e)],
    };

    let Some(data) = line.strip_prefix("data: ") else {
        return Vec::new();
    };
    if data == "[DONE]" {
        return Vec::new();
    }

    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return vec![Err(LlmError::ResponseParse(e.to_string()))],
    };
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    if let Some(content) = choice.delta.content
        && !content.is_empty()
    {
        out.push(Ok(StreamChunk::Delta(content)));
    }
    if let Some(finish_reason) = choice.finish_reason {
        // Usage arrives on the final chunk, either top-level or under the
        // vendor extension block.
        let usage = chunk
            .usage
            .or(chunk.x_groq.and_then(|x| x.usage))
            .unwrap_or_default();
        out.push(Ok(StreamChunk::Finish {
            finish_reason,
            usage: TokenCount {
                input: usage.prompt_tokens,
                output: usage.completion_tokens,
            },
        }));
    }
    out
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<Usage>,
    x_groq: Option<VendorExtension>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct VendorExtension {
    usage: Option<Usage>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
