//! Secondary provider: a Gemini-style generateContent endpoint.
//!
//! The canonical message list maps onto Gemini's shape: system turns become
//! the `systemInstruction`, user turns stay `user`, assistant turns become
//! `model`. Streaming uses `:streamGenerateContent?alt=sse`; the vendor
//! reports no finish reason for streamed output, so `"stop"` is
//! synthesized after the last chunk.

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

use parley_core::models::message::{ChatTurn, Role};
use parley_core::models::token_count::TokenCount;

use crate::error::LlmError;
use crate::provider::{
    check_status, sse_lines, ChunkStream, ProviderClient, ProviderResponse, StreamChunk,
};

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn post_generate(
        &self,
        turns: &[ChatTurn],
        model: &str,
        streaming: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let url = if streaming {
            format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                self.base_url, model
            )
        } else {
            format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
        };

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&convert_turns(turns))
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    async fn generate(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ProviderResponse, LlmError> {
        let response = self.post_generate(turns, model, false).await?;
        let body: GenerateContentResponse = response.json().await?;

        let content = body
            .candidates
            .first()
            .map(candidate_text)
            .ok_or_else(|| LlmError::ResponseParse("no candidates in response".to_string()))?;

        let usage = body.usage_metadata.unwrap_or_default();

        Ok(ProviderResponse {
            content,
            finish_reason: "stop".to_string(),
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        })
    }

    async fn generate_stream(
        &self,
        turns: &[ChatTurn],
        model: &str,
    ) -> Result<ChunkStream, LlmError> {
        let response = self.post_generate(turns, model, true).await?;
        let deltas = sse_lines(response).flat_map(|line| stream::iter(parse_stream_line(line)));
        // The vendor ends the body without a terminal finish marker.
        let finish = stream::once(async {
            Ok(StreamChunk::Finish {
                finish_reason: "stop".to_string(),
                usage: TokenCount::default(),
            })
        });
        Ok(Box::pin(deltas.chain(finish)))
    }
}

fn parse_stream_line(line: Result<String, LlmError>) -> Vec<Result<StreamChunk, LlmError>> {
    let line = match line {
        Ok(line) => line,
        Err(e) => return vec![Err(e)],
    };

    let Some(data) = line.strip_prefix("data: ") else {
        return Vec::new();
    };

    let chunk: GenerateContentResponse = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return vec![Err(LlmError::ResponseParse(e.to_string()))],
    };

    match chunk.candidates.first() {
        Some(candidate) => {
            let text = candidate_text(candidate);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Ok(StreamChunk::Delta(text))]
            }
        }
        None => Vec::new(),
    }
}

fn candidate_text(candidate: &Candidate) -> String {
    candidate
        .content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect()
}

/// Split system turns off into the system instruction and map the rest to
/// Gemini's `user`/`model` roles.
fn convert_turns(turns: &[ChatTurn]) -> GenerateContentRequest {
    let mut system_instruction = None;
    let mut contents = Vec::new();

    for turn in turns {
        match turn.role {
            Role::System => {
                system_instruction = Some(Content {
                    role: None,
                    parts: vec![Part {
                        text: Some(turn.content.clone()),
                    }],
                });
            }
            Role::User | Role::Assistant => {
                let role = if turn.role == Role::User { "user" } else { "model" };
                contents.push(Content {
                    role: Some(role.to_string()),
                    parts: vec![Part {
                        text: Some(turn.content.clone()),
                    }],
                });
            }
        }
    }

    GenerateContentRequest {
        system_instruction,
        contents,
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
