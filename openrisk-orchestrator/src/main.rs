use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod repository;
pub mod service;
pub mod state;

#[cfg(test)]
mod testing;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "openrisk_orchestrator=debug,openrisk_runner=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OpenRisk Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!("Project root: {}", config.project_root.display());
    tracing::info!("Registry: {}", config.sources_path().display());
    tracing::info!("Overlap policy: {}", config.overlap_policy);
    if config.llm_api_key.is_none() {
        tracing::warn!("OPENRISK_LLM_API_KEY not set, advisory endpoints will refuse requests");
    }

    let addr = config.bind_addr.clone();

    // Build router with all API endpoints
    let app = api::create_router(AppState::new(config));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
