use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response parsing failed: {0}")]
    ResponseParse(String),

    #[error("stream transport error: {0}")]
    StreamTransport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
