//! Registry Service
//!
//! Business logic for onboarding repositories and browsing candidates.

use chrono::{SecondsFormat, Utc};
use openrisk_core::domain::registry::{RepoName, RepoNameError, RepositoryRecord};
use openrisk_core::domain::sample::{SampleRow, clamp_sample_limit};
use openrisk_core::dto::registry::AddOutcome;
use thiserror::Error;

use crate::repository::registry::RegistryError;
use crate::repository::sample::SampleError;
use crate::repository::{registry_repository, sample_repository};
use crate::state::AppState;

/// Service error type
#[derive(Debug, Error)]
pub enum RegistryServiceError {
    #[error(transparent)]
    InvalidName(#[from] RepoNameError),

    #[error(transparent)]
    Storage(#[from] RegistryError),

    #[error(transparent)]
    Sample(#[from] SampleError),
}

pub type Result<T> = std::result::Result<T, RegistryServiceError>;

/// List every registered repository, in document order
pub async fn list_repos(state: &AppState) -> Result<Vec<RepositoryRecord>> {
    let registry = registry_repository::read(&state.config.sources_path()).await?;
    Ok(registry.repos)
}

/// Register `repo_name` (`org/repo`)
///
/// Idempotent: a repository already present is reported as such and the
/// document is left untouched.
pub async fn add_repo(state: &AppState, repo_name: &str) -> Result<AddOutcome> {
    let name: RepoName = repo_name.parse()?;
    let path = state.config.sources_path();

    // Check and append under one lock so two adds of the same repo cannot
    // both append
    let _write = state.registry_write.lock().await;

    let registry = registry_repository::read(&path).await?;
    if registry.contains(&name.org, &name.repo) {
        tracing::debug!("Repository {} already registered", name);
        return Ok(AddOutcome::AlreadyExists);
    }

    let registered_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    registry_repository::append(&path, &name.org, &name.repo, &registered_at).await?;

    tracing::info!("Repository registered: {}", name);
    Ok(AddOutcome::Added)
}

/// First rows of the candidate list
///
/// `limit` is the raw query value: non-numeric means the default, numbers are
/// clamped to the allowed range.
pub async fn sample(state: &AppState, limit: Option<&str>) -> Result<Vec<SampleRow>> {
    let limit = clamp_sample_limit(limit);
    let rows = sample_repository::read_sample(&state.config.repo_list_path(), limit).await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state(root: &std::path::Path) -> AppState {
        AppState::new(Config::default().with_project_root(root))
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        assert_eq!(add_repo(&state, "acme/widgets").await.unwrap(), AddOutcome::Added);
        assert_eq!(
            add_repo(&state, " acme/widgets ").await.unwrap(),
            AddOutcome::AlreadyExists
        );

        let repos = list_repos(&state).await.unwrap();
        assert_eq!(repos.len(), 1);
        let registered_at = repos[0].registered_at.as_deref().unwrap();
        assert!(registered_at.ends_with('Z'));
        assert_eq!(registered_at.len(), "2024-05-01T10:00:00.000Z".len());
    }

    #[tokio::test]
    async fn test_concurrent_adds_append_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move { add_repo(&state, "acme/widgets").await.unwrap() })
            })
            .collect();

        let mut added = 0;
        for handle in handles {
            if handle.await.unwrap() == AddOutcome::Added {
                added += 1;
            }
        }

        assert_eq!(added, 1);
        assert_eq!(list_repos(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_name_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        for bad in ["widgets", "acme/", "acme/widgets/extra", "../etc", "acme/.."] {
            let err = add_repo(&state, bad).await.unwrap_err();
            assert!(matches!(err, RegistryServiceError::InvalidName(_)), "{bad}");
        }
        assert!(!state.config.sources_path().exists());
    }

    #[tokio::test]
    async fn test_sample_clamps_limit() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let mut csv = String::from("id,platform,repo_name\n");
        for i in 0..400 {
            csv.push_str(&format!("{i},github,o/r{i}\n"));
        }
        std::fs::write(state.config.repo_list_path(), csv).unwrap();

        assert_eq!(sample(&state, Some("5")).await.unwrap().len(), 5);
        assert_eq!(sample(&state, Some("abc")).await.unwrap().len(), 300);
        assert_eq!(sample(&state, Some("0")).await.unwrap().len(), 1);
        assert_eq!(sample(&state, None).await.unwrap().len(), 300);
        assert_eq!(sample(&state, Some("5000")).await.unwrap().len(), 400);
    }
}
