//! SSE frame encoding for streaming responses.
//!
//! Each lifecycle event maps to one two-line text frame: an event-name
//! line and a JSON data line, followed by a blank line. Encoding is
//! synchronous and side-effect-free; nothing is buffered beyond the frame
//! being built.

use serde_json::json;
use uuid::Uuid;

use parley_core::models::message::Message;

fn frame(event: &str, data: &serde_json::Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

pub fn message_start(message_id: Uuid, model: &str) -> String {
    frame(
        "message_start",
        &json!({
            "type": "message_start",
            "message": {"id": message_id.to_string(), "model": model},
        }),
    )
}

pub fn content_block_start() -> String {
    frame(
        "content_block_start",
        &json!({
            "type": "content_block_start",
            "index": 0,
            "content_block": {"type": "text", "text": ""},
        }),
    )
}

pub fn content_block_delta(text: &str) -> String {
    frame(
        "content_block_delta",
        &json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": text},
        }),
    )
}

pub fn content_block_stop() -> String {
    frame(
        "content_block_stop",
        &json!({"type": "content_block_stop", "index": 0}),
    )
}

pub fn message_delta(stop_reason: &str, output_tokens: u64) -> String {
    frame(
        "message_delta",
        &json!({
            "type": "message_delta",
            "delta": {"stop_reason": stop_reason},
            "usage": {"output_tokens": output_tokens},
        }),
    )
}

pub fn message_stop() -> String {
    frame("message_stop", &json!({"type": "message_stop"}))
}

pub fn error(error_type: &str, message: &str) -> String {
    frame(
        "error",
        &json!({
            "type": "error",
            "error": {"type": error_type, "message": message},
        }),
    )
}

/// Notification frame for the polling events endpoint.
pub fn new_message(message: &Message) -> String {
    match serde_json::to_value(message) {
        Ok(data) => frame("new_message", &data),
        Err(e) => error("internal_error", &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Split a frame into its event name and parsed JSON payload.
    fn parse(frame: &str) -> (String, serde_json::Value) {
        assert!(frame.ends_with("\n\n"), "frame must end with a blank line");
        let mut lines = frame.lines();
        let event = lines
            .next()
            .unwrap()
            .strip_prefix("event: ")
            .unwrap()
            .to_string();
        let data = lines.next().unwrap().strip_prefix("data: ").unwrap();
        (event, serde_json::from_str(data).unwrap())
    }

    #[test]
    fn message_start_carries_id_and_model() {
        let id = Uuid::new_v4();
        let (event, data) = parse(&message_start(id, "llama-3.1-8b-instant"));

        assert_eq!(event, "message_start");
        assert_eq!(data["type"], "message_start");
        assert_eq!(data["message"]["id"], id.to_string());
        assert_eq!(data["message"]["model"], "llama-3.1-8b-instant");
    }

    #[test]
    fn content_block_start_opens_an_empty_text_block() {
        let (event, data) = parse(&content_block_start());

        assert_eq!(event, "content_block_start");
        assert_eq!(data["index"], 0);
        assert_eq!(data["content_block"]["type"], "text");
        assert_eq!(data["content_block"]["text"], "");
    }

    #[test]
    fn delta_carries_the_fragment() {
        let (event, data) = parse(&content_block_delta("hel\nlo"));

        assert_eq!(event, "content_block_delta");
        assert_eq!(data["delta"]["type"], "text_delta");
        assert_eq!(data["delta"]["text"], "hel\nlo");
    }

    #[test]
    fn message_delta_carries_stop_reason_and_usage() {
        let (event, data) = parse(&message_delta("length", 42));

        assert_eq!(event, "message_delta");
        assert_eq!(data["delta"]["stop_reason"], "length");
        assert_eq!(data["usage"]["output_tokens"], 42);
    }

    #[test]
    fn terminal_frames_have_expected_shape() {
        let (event, data) = parse(&content_block_stop());
        assert_eq!(event, "content_block_stop");
        assert_eq!(data["index"], 0);

        let (event, data) = parse(&message_stop());
        assert_eq!(event, "message_stop");
        assert_eq!(data["type"], "message_stop");

        let (event, data) = parse(&error("stream_error", "boom"));
        assert_eq!(event, "error");
        assert_eq!(data["error"]["type"], "stream_error");
        assert_eq!(data["error"]["message"], "boom");
    }
}
