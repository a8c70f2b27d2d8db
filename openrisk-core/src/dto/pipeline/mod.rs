//! Pipeline DTOs

use serde::{Deserialize, Serialize};

/// Model variant used when a request does not name one
pub const DEFAULT_MODEL_TYPE: &str = "baseline";

/// Request to ingest a single repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRepo {
    #[serde(default)]
    pub repo_name: String,
}

/// Body or query selecting a model variant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSelector {
    pub model_type: Option<String>,
}

impl ModelSelector {
    pub fn model_type(&self) -> &str {
        self.model_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL_TYPE)
    }
}

/// Response of a single-step run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRunResponse {
    pub ok: bool,
    /// Exit code, `None` when the process never started or died on a signal
    pub code: Option<i32>,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_default() {
        assert_eq!(ModelSelector::default().model_type(), "baseline");
        let blank = ModelSelector {
            model_type: Some("  ".to_string()),
        };
        assert_eq!(blank.model_type(), "baseline");
        let transformer = ModelSelector {
            model_type: Some("transformer".to_string()),
        };
        assert_eq!(transformer.model_type(), "transformer");
    }
}
