use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chatcoach_audit::{AuditSink, JsonlAuditSink, NullAuditSink};
use chatcoach_cache::SessionCache;
use chatcoach_collab::{DimensionFetcher, ScreenshotClient, StubProfileFacade};
use chatcoach_config::AppConfig;
use chatcoach_coordinator::PredictCoordinator;
use chatcoach_llm::{LlmRouter, OpenAiCompatibleClient, ProviderCandidate, ProviderClient, ProviderTier};
use chatcoach_orchestrator::Orchestrator;
use chatcoach_stages::{IntimacyEvaluator, LocalLexicalEvaluator};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load_from("config/default.toml")?;
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_new(&config.telemetry.log_level).unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let coordinator = Arc::new(build_coordinator(&config));
    let state = chatcoach_http::AppState::new(coordinator);

    let cors = if config.boundary.cors_allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .boundary
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
    };

    let app = chatcoach_http::router(state).layer(TraceLayer::new_for_http()).layer(cors);

    let port: u16 = env::var("CHATCOACH_PORT").ok().and_then(|raw| raw.parse().ok()).unwrap_or(8080);
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr, "chatcoach-http listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Wires one LLM provider across all three quality tiers, the in-process
/// cache, the screenshot/profile collaborators, and the orchestrator. A
/// richer deployment would configure multiple candidates per tier for
/// fallback (spec §4.1); a single pinned provider is this process's
/// starting point.
fn build_coordinator(config: &AppConfig) -> PredictCoordinator {
    let api_key = env::var("CHATCOACH_LLM_API_KEY").unwrap_or_default();
    let base_url = env::var("CHATCOACH_LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    let provider: Arc<dyn ProviderClient> = Arc::new(OpenAiCompatibleClient::new(config.provider.default_provider.clone(), base_url, api_key, true));
    let candidate = ProviderCandidate::new(config.provider.default_provider.clone(), config.provider.default_model.clone());
    let routing_table = vec![
        (ProviderTier::Low, vec![candidate.clone()]),
        (ProviderTier::Medium, vec![candidate.clone()]),
        (ProviderTier::High, vec![candidate.clone()]),
    ];
    let cool_off = Duration::from_secs(config.provider.cool_off_seconds);
    let llm = Arc::new(LlmRouter::new(vec![provider], routing_table, cool_off, candidate));

    let screenshot_base_url = env::var("CHATCOACH_SCREENSHOT_BASE_URL").unwrap_or_else(|_| "http://localhost:8090".to_string());
    let screenshot_client = Arc::new(ScreenshotClient::new(screenshot_base_url));
    let dimension_fetcher = DimensionFetcher::new();
    let cache = Arc::new(SessionCache::new());

    let intimacy_evaluator: Arc<dyn IntimacyEvaluator> = Arc::new(LocalLexicalEvaluator);
    let audit: Arc<dyn AuditSink> = if env::var("CHATCOACH_AUDIT_DIR").is_ok() {
        Arc::new(JsonlAuditSink::new(env::var("CHATCOACH_AUDIT_DIR").unwrap()))
    } else {
        Arc::new(NullAuditSink)
    };

    let orchestrator = Arc::new(Orchestrator::new(
        llm,
        Arc::new(StubProfileFacade),
        intimacy_evaluator,
        audit,
        config.prompt.clone(),
        config.orchestrator.clone(),
        true,
        "reply_v1",
    ));

    PredictCoordinator::new(orchestrator, cache, screenshot_client, dimension_fetcher, config.clone())
}
