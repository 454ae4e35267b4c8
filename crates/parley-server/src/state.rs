use std::sync::Arc;

use parley_llm::failover::FailoverRouter;
use parley_store::MessageStore;

use crate::middleware::rate_limit::RateLimiter;
use crate::settings::Settings;

/// Shared application state, injected into all route handlers via Axum
/// state. Both provider clients are constructed once in `main` and live
/// inside the failover router for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub llm: Arc<FailoverRouter>,
    pub limiter: Arc<RateLimiter>,
    pub settings: Arc<Settings>,
}
