//! parley-server
//!
//! The HTTP service: auth and rate-limit middleware in front of the
//! generation pipeline, with synchronous and SSE-streamed message
//! endpoints.

pub mod error;
pub mod generation;
pub mod middleware;
pub mod routes;
pub mod settings;
pub mod sse;
pub mod state;

use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use state::AppState;

/// Assemble the full application router.
///
/// Protected routes sit behind auth extraction and the rate limiter;
/// health stays open. Audit logging and CORS wrap everything.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/v1/conversations",
            post(routes::conversations::create_conversation),
        )
        .route(
            "/api/v1/conversations/{conversation_id}",
            get(routes::conversations::get_conversation),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/messages",
            get(routes::messages::list_messages),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/messages",
            post(routes::messages::send),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/messages/stream",
            post(routes::messages::stream),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/events",
            get(routes::messages::events),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::enforce,
        ))
        .layer(axum_mw::from_fn(middleware::auth::require_auth))
        .route("/health", get(routes::health::health_check))
        .layer(axum_mw::from_fn(middleware::audit::audit_log))
        .layer(cors)
        .with_state(state)
}
