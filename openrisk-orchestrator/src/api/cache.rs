//! Cache API Handlers
//!
//! Read-only view of a repository's cached metrics.

use axum::{
    Json,
    extract::{Query, State},
};
use openrisk_core::dto::cache::{RawCacheQuery, RawCacheResponse};

use crate::api::error::ApiResult;
use crate::service::cache_service;
use crate::state::AppState;

/// GET /api/cache/raw?repo=org/repo
pub async fn raw(
    State(state): State<AppState>,
    Query(query): Query<RawCacheQuery>,
) -> ApiResult<Json<RawCacheResponse>> {
    let repo = query.repo.unwrap_or_default();
    let (name, metrics) = cache_service::raw_metrics(&state, &repo).await?;

    Ok(Json(RawCacheResponse {
        ok: true,
        repo: name.to_string(),
        metrics,
    }))
}
