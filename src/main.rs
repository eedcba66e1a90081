use anyhow::Context;
use tracing_subscriber::EnvFilter;

use doc_assistant::config::AppConfig;
use doc_assistant::routes;
use doc_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded (env: {})", std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into()));

    let addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(
        "Chunking: size={} overlap={} context_chunk_limit={}",
        config.chunking.chunk_size,
        config.chunking.overlap,
        config.chunking.context_chunk_limit
    );

    if config.admin.token.is_empty() {
        tracing::warn!("No admin token configured; PUT /api/settings/llm is disabled");
    }

    let state = AppState::new(config).context("Invalid chunking configuration")?;

    let status = state.gate.status();
    if !status.api_key_configured {
        tracing::warn!("No API key configured for '{}'; set APP__LLM__API_KEY", status.provider);
    }

    let app = routes::router(state);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
