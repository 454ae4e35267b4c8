//! Sliding-window admission control.
//!
//! Two independent 60-second windows per user: a standard counter applied
//! to every authenticated request and a stricter generation counter for
//! the two message-sending endpoints. State lives in process memory only.
//! It is not shared across instances and resets on restart; multi-instance
//! deployments need an externally shared counting store.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

const WINDOW: Duration = Duration::from_secs(60);

type Windows = Mutex<HashMap<String, VecDeque<Instant>>>;

/// Per-user sliding-window counters for both traffic classes.
pub struct RateLimiter {
    standard_limit: u32,
    generation_limit: u32,
    standard: Windows,
    generation: Windows,
}

impl RateLimiter {
    pub fn new(standard_limit: u32, generation_limit: u32) -> Self {
        Self {
            standard_limit,
            generation_limit,
            standard: Mutex::new(HashMap::new()),
            generation: Mutex::new(HashMap::new()),
        }
    }

    /// Admission check for the standard class. On rejection returns the
    /// seconds until the oldest retained entry falls out of the window.
    pub fn check_standard(&self, user_id: &str, now: Instant) -> Result<(), u64> {
        Self::check(&self.standard, self.standard_limit, user_id, now)
    }

    /// Admission check for the generation class.
    pub fn check_generation(&self, user_id: &str, now: Instant) -> Result<(), u64> {
        Self::check(&self.generation, self.generation_limit, user_id, now)
    }

    fn check(windows: &Windows, limit: u32, user_id: &str, now: Instant) -> Result<(), u64> {
        let mut windows = windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(user_id.to_string()).or_default();

        // Evict entries older than the trailing window, oldest first.
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) > WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= limit as usize {
            // floor(oldest - cutoff) + 1 where cutoff = now - WINDOW.
            let oldest = window
                .front()
                .copied()
                .unwrap_or(now);
            let into_window = WINDOW.saturating_sub(now.duration_since(oldest));
            return Err(into_window.as_secs() + 1);
        }

        window.push_back(now);
        Ok(())
    }
}

/// Match the two message-sending paths:
/// `/api/v1/conversations/{id}/messages` and `.../messages/stream`.
fn is_generation_path(path: &str) -> bool {
    let parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    parts.len() >= 6
        && parts.get(1) == Some(&"api")
        && parts.get(2) == Some(&"v1")
        && parts.get(3) == Some(&"conversations")
        && parts.get(5) == Some(&"messages")
}

/// Admission-control middleware, evaluated before any handler runs.
///
/// Health checks and unauthenticated requests bypass both counters. A
/// request hitting the generation-class limit is rejected before the
/// standard counter is consulted.
pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if path == "/health" {
        return next.run(req).await;
    }

    let Some(user) = req.extensions().get::<AuthUser>().cloned() else {
        return next.run(req).await;
    };

    let now = Instant::now();

    if is_generation_path(&path) && req.method() == Method::POST {
        if let Err(retry_after) = state.limiter.check_generation(&user.sub, now) {
            return ApiError::RateLimited {
                message: "AI generation rate limit exceeded".to_string(),
                retry_after,
            }
            .into_response();
        }
    }

    if let Err(retry_after) = state.limiter.check_standard(&user.sub, now) {
        return ApiError::RateLimited {
            message: "Rate limit exceeded".to_string(),
            retry_after,
        }
        .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(60, 3);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_generation("u1", now).is_ok());
        }

        let retry_after = limiter
            .check_generation("u1", now + Duration::from_millis(5))
            .unwrap_err();
        assert!((1..=60).contains(&retry_after));
    }

    #[test]
    fn entries_expire_after_the_window() {
        let limiter = RateLimiter::new(60, 2);
        let start = Instant::now();

        assert!(limiter.check_generation("u1", start).is_ok());
        assert!(limiter.check_generation("u1", start).is_ok());
        assert!(limiter.check_generation("u1", start).is_err());

        // Just past the window: both entries evicted.
        let later = start + WINDOW + Duration::from_secs(1);
        assert!(limiter.check_generation("u1", later).is_ok());
    }

    #[test]
    fn users_are_counted_independently() {
        let limiter = RateLimiter::new(60, 1);
        let now = Instant::now();

        assert!(limiter.check_generation("u1", now).is_ok());
        assert!(limiter.check_generation("u2", now).is_ok());
        assert!(limiter.check_generation("u1", now).is_err());
    }

    #[test]
    fn classes_are_counted_independently() {
        let limiter = RateLimiter::new(2, 1);
        let now = Instant::now();

        assert!(limiter.check_generation("u1", now).is_ok());
        assert!(limiter.check_generation("u1", now).is_err());
        // The standard window is untouched by generation traffic.
        assert!(limiter.check_standard("u1", now).is_ok());
        assert!(limiter.check_standard("u1", now).is_ok());
        assert!(limiter.check_standard("u1", now).is_err());
    }

    #[test]
    fn retry_after_shrinks_as_the_window_slides() {
        let limiter = RateLimiter::new(60, 1);
        let start = Instant::now();

        assert!(limiter.check_generation("u1", start).is_ok());

        let at_10s = limiter
            .check_generation("u1", start + Duration::from_secs(10))
            .unwrap_err();
        let at_50s = limiter
            .check_generation("u1", start + Duration::from_secs(50))
            .unwrap_err();

        assert_eq!(at_10s, 51);
        assert_eq!(at_50s, 11);
    }

    #[test]
    fn generation_paths_are_recognized() {
        assert!(is_generation_path(
            "/api/v1/conversations/7a9d1f6e-0000-0000-0000-000000000000/messages"
        ));
        assert!(is_generation_path(
            "/api/v1/conversations/7a9d1f6e-0000-0000-0000-000000000000/messages/stream"
        ));
        assert!(!is_generation_path("/api/v1/conversations"));
        assert!(!is_generation_path(
            "/api/v1/conversations/7a9d1f6e-0000-0000-0000-000000000000/events"
        ));
        assert!(!is_generation_path("/health"));
    }
}
