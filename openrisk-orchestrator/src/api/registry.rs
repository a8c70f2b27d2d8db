//! Registry API Handlers
//!
//! HTTP endpoints for onboarding repositories and browsing candidates.

use axum::{
    Json,
    extract::{Query, State},
};
use openrisk_core::dto::registry::{AddRepo, AddRepoResponse, RepoList, SampleList, SampleQuery};

use crate::api::body::LenientJson;
use crate::api::error::ApiResult;
use crate::service::registry_service;
use crate::state::AppState;

/// GET /api/registry/repos
pub async fn list_repos(State(state): State<AppState>) -> ApiResult<Json<RepoList>> {
    tracing::debug!("Listing registered repositories");

    let repos = registry_service::list_repos(&state).await?;
    Ok(Json(RepoList { repos }))
}

/// POST /api/registry/add
/// Register a repository; idempotent
pub async fn add_repo(
    State(state): State<AppState>,
    LenientJson(req): LenientJson<AddRepo>,
) -> ApiResult<Json<AddRepoResponse>> {
    tracing::info!("Registering repository: {}", req.repo_name);

    let outcome = registry_service::add_repo(&state, &req.repo_name).await?;
    Ok(Json(AddRepoResponse::from(outcome)))
}

/// GET /api/registry/sample?limit=N
pub async fn sample(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> ApiResult<Json<SampleList>> {
    let items = registry_service::sample(&state, query.limit.as_deref()).await?;
    Ok(Json(SampleList { items }))
}
