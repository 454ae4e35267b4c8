use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use parley_llm::failover::FailoverRouter;
use parley_llm::gemini::GeminiClient;
use parley_llm::openai_compat::OpenAiCompatClient;
use parley_llm::provider::ProviderClient;
use parley_server::middleware::rate_limit::RateLimiter;
use parley_server::settings::Settings;
use parley_server::state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Structured JSON logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env();

    let http = reqwest::Client::new();
    let primary: Arc<dyn ProviderClient> = Arc::new(OpenAiCompatClient::new(
        http.clone(),
        settings.primary_base_url.clone(),
        settings.primary_api_key.clone(),
    ));
    let secondary: Arc<dyn ProviderClient> = Arc::new(GeminiClient::new(
        http,
        settings.secondary_base_url.clone(),
        settings.secondary_api_key.clone(),
    ));

    let state = AppState {
        store: Arc::new(parley_store::memory::InMemoryStore::new()),
        llm: Arc::new(FailoverRouter::new(
            primary,
            secondary,
            settings.fallback_model.clone(),
        )),
        limiter: Arc::new(RateLimiter::new(
            settings.rate_limit_standard,
            settings.rate_limit_ai,
        )),
        settings: Arc::new(settings.clone()),
    };

    let app = parley_server::app(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
