//! Registry DTOs

use serde::{Deserialize, Serialize};

use crate::domain::registry::RepositoryRecord;
use crate::domain::sample::SampleRow;

/// Request to onboard a repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddRepo {
    /// `org/repo`
    #[serde(default)]
    pub repo_name: String,
}

/// What `add` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    AlreadyExists,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRepoResponse {
    pub ok: bool,
    pub message: AddOutcome,
}

impl From<AddOutcome> for AddRepoResponse {
    fn from(message: AddOutcome) -> Self {
        Self { ok: true, message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoList {
    pub repos: Vec<RepositoryRecord>,
}

/// Query for a bounded read of the candidate list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleQuery {
    /// Raw value; normalised with `clamp_sample_limit`
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleList {
    pub items: Vec<SampleRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_outcome_wire_format() {
        let body = serde_json::to_value(AddRepoResponse::from(AddOutcome::AlreadyExists)).unwrap();
        assert_eq!(body, serde_json::json!({"ok": true, "message": "already_exists"}));
    }

    #[test]
    fn test_add_repo_missing_field() {
        let req: AddRepo = serde_json::from_str("{}").unwrap();
        assert!(req.repo_name.is_empty());
    }
}
