use axum::Json;
use serde_json::{json, Value};

/// Liveness probe. Bypasses auth and rate limiting.
pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
