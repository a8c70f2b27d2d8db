//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod advisory;
pub mod body;
pub mod cache;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod registry;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Create the main router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let docs = ServeDir::new(state.config.docs_dir_path());

    let api = Router::new()
        // Registry endpoints
        .route("/registry/repos", get(registry::list_repos))
        .route("/registry/add", post(registry::add_repo))
        .route("/registry/sample", get(registry::sample))
        // Cache endpoints
        .route("/cache/raw", get(cache::raw))
        // Pipeline endpoints
        .route("/pipeline/ingest", post(pipeline::ingest))
        .route("/pipeline/train", post(pipeline::train))
        .route("/pipeline/predict", post(pipeline::predict))
        .route("/pipeline/signals-run", post(pipeline::run_signals))
        .route("/pipeline/status", get(pipeline::status))
        .route("/pipeline/predictions", get(pipeline::predictions))
        // Advisory endpoints
        .route("/advisory/rag", post(advisory::rag))
        .route("/advisory/advise", post(advisory::advise));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .nest("/api", api)
        // Generated reports, read-only
        .nest_service("/docs", docs)
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
