//! Registry domain types
//!
//! The registry is the durable list of onboarded repositories plus the global
//! defaults applied when a record leaves a field out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Platform used when neither the record nor the defaults name one
pub const DEFAULT_PLATFORM: &str = "github";
pub const DEFAULT_BASE_URL: &str = "https://oss.open-digger.cn";
pub const DEFAULT_CACHE_DIR: &str = "data/cache";
pub const DEFAULT_SQLITE_PATH: &str = "data/sqlite/opendigger.db";

/// An onboarded repository
///
/// Identity is `(org, repo)`. Records are appended once and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub org: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl RepositoryRecord {
    /// Creates an enabled record with no platform override
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            platform: None,
            enabled: true,
            registered_at: None,
        }
    }

    pub fn matches(&self, org: &str, repo: &str) -> bool {
        self.org == org && self.repo == repo
    }
}

/// Global fallback values from the `defaults:` section
///
/// Unknown keys are kept so they survive into scoped documents and listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryDefaults {
    values: BTreeMap<String, String>,
}

impl RegistryDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn platform(&self) -> Option<&str> {
        self.get("platform")
    }

    pub fn base_url(&self) -> Option<&str> {
        self.get("base_url")
    }

    pub fn cache_dir(&self) -> Option<&str> {
        self.get("cache_dir")
    }

    pub fn sqlite_path(&self) -> Option<&str> {
        self.get("sqlite_path")
    }

    pub fn platform_or_default(&self) -> &str {
        self.platform().unwrap_or(DEFAULT_PLATFORM)
    }

    pub fn base_url_or_default(&self) -> &str {
        self.base_url().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn cache_dir_or_default(&self) -> &str {
        self.cache_dir().unwrap_or(DEFAULT_CACHE_DIR)
    }

    pub fn sqlite_path_or_default(&self) -> &str {
        self.sqlite_path().unwrap_or(DEFAULT_SQLITE_PATH)
    }
}

/// A parsed registry document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub defaults: RegistryDefaults,
    pub repos: Vec<RepositoryRecord>,
}

impl Registry {
    pub fn find(&self, org: &str, repo: &str) -> Option<&RepositoryRecord> {
        self.repos.iter().find(|r| r.matches(org, repo))
    }

    pub fn contains(&self, org: &str, repo: &str) -> bool {
        self.find(org, repo).is_some()
    }

    /// Resolves the platform for a repository
    ///
    /// Precedence: the record's own platform, then `defaults.platform`, then
    /// [`DEFAULT_PLATFORM`].
    pub fn resolve_platform(&self, org: &str, repo: &str) -> String {
        self.find(org, repo)
            .and_then(|r| r.platform.as_deref())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.defaults.platform_or_default())
            .to_string()
    }
}

// =============================================================================
// Repository names
// =============================================================================

/// A validated `org/repo` pair
///
/// Both segments are non-empty, restricted to `[A-Za-z0-9._-]` and never `.`
/// or `..`, so a name is always safe to join onto a cache path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoName {
    pub org: String,
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoNameError {
    #[error("repository name must look like org/repo, got '{0}'")]
    Shape(String),

    #[error("invalid repository segment '{0}'")]
    Segment(String),
}

impl RepoName {
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Result<Self, RepoNameError> {
        let org = org.into();
        let repo = repo.into();
        validate_segment(&org)?;
        validate_segment(&repo)?;
        Ok(Self { org, repo })
    }

    /// Lock / display key, `org/repo`
    pub fn key(&self) -> String {
        self.to_string()
    }
}

fn validate_segment(segment: &str) -> Result<(), RepoNameError> {
    let valid_chars = segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if segment.is_empty() || segment == "." || segment == ".." || !valid_chars {
        return Err(RepoNameError::Segment(segment.to_string()));
    }

    Ok(())
}

impl FromStr for RepoName {
    type Err = RepoNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('/');

        match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(repo), None) => RepoName::new(org.trim(), repo.trim()),
            _ => Err(RepoNameError::Shape(trimmed.to_string())),
        }
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}
