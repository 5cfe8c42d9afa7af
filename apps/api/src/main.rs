mod config;
mod errors;
mod hub;
mod interview;
mod llm_client;
mod report;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::hub::ExtensionHub;
use crate::interview::prompt_config::InterviewerPrompt;
use crate::interview::store::SessionStore;
use crate::llm_client::LlmClient;
use crate::report::rubric::HeuristicRubricScorer;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (only malformed values fail)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview Coach API v{}", env!("CARGO_PKG_VERSION"));

    // Interviewer prompt config (embedded default, optionally overlaid by a file)
    let prompt = Arc::new(InterviewerPrompt::load_or_default(
        config.prompt_path.as_deref(),
    )?);
    info!(
        "Interviewer prompt '{}': {} stages, wrap at {}m",
        prompt.name,
        prompt.session_flow.len(),
        prompt.policies.wrap_up_at_minutes
    );

    // Initialize LLM client
    let model = config
        .llm_model
        .clone()
        .or_else(|| Some(prompt.llm.cloud.model.clone()).filter(|m| !m.trim().is_empty()))
        .unwrap_or_else(|| llm_client::DEFAULT_MODEL.to_string());
    let llm = LlmClient::new(
        config.openrouter_api_url.clone(),
        config.openrouter_api_key.clone(),
        model,
    )?;
    info!(
        "LLM client initialized (model: {}, default mode: {})",
        llm.model(),
        config.response_mode
    );
    if config.openrouter_api_key.is_none() {
        info!("OPENROUTER_API_KEY not set; model-mode turns will fail until it is configured");
    }

    let state = AppState {
        config: config.clone(),
        prompt,
        llm: Arc::new(llm),
        rubric_scorer: Arc::new(HeuristicRubricScorer),
        sessions: SessionStore::new(),
        hub: Arc::new(Mutex::new(ExtensionHub::new(config.hub_queue_capacity))),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web app and extension

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
