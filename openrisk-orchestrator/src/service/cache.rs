//! Cache Service
//!
//! Resolves where a repository's metrics live and projects them into
//! summaries.

use openrisk_core::domain::metric::MetricSummary;
use openrisk_core::domain::registry::{RepoName, RepoNameError};
use std::path::Path;
use thiserror::Error;

use crate::repository::cache::CacheError;
use crate::repository::registry::RegistryError;
use crate::repository::{cache_repository, registry_repository};
use crate::state::AppState;

/// Service error type
#[derive(Debug, Error)]
pub enum CacheServiceError {
    #[error(transparent)]
    InvalidName(#[from] RepoNameError),

    #[error("no cached metrics for {0}")]
    NotFound(RepoName),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Cache(CacheError),
}

pub type Result<T> = std::result::Result<T, CacheServiceError>;

/// Projects every cached metric of `name`, unordered
///
/// The platform comes from the registry (record, then defaults, then
/// `github`), so unregistered repositories resolve through the defaults.
pub async fn project(state: &AppState, name: &RepoName) -> Result<Vec<MetricSummary>> {
    let registry = registry_repository::read(&state.config.sources_path()).await?;
    let platform = registry.resolve_platform(&name.org, &name.repo);
    let cache_root = state
        .config
        .resolve(Path::new(registry.defaults.cache_dir_or_default()));
    let dir = cache_repository::repo_dir(&cache_root, &platform, name);

    cache_repository::project(&dir).await.map_err(|e| match e {
        CacheError::NotFound(_) => CacheServiceError::NotFound(name.clone()),
        other => CacheServiceError::Cache(other),
    })
}

/// Raw cache view for `repo` (`org/repo`), metrics sorted by name
pub async fn raw_metrics(state: &AppState, repo: &str) -> Result<(RepoName, Vec<MetricSummary>)> {
    let name: RepoName = repo.parse()?;
    let mut metrics = project(state, &name).await?;
    metrics.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::debug!("Raw cache for {}: {} metric(s)", name, metrics.len());
    Ok((name, metrics))
}
