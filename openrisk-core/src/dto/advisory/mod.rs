//! Advisory / RAG DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Question about one repository, answered from assembled context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagQuestion {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub question: String,
}

/// Request for governance actions derived from a risk report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdviseRequest {
    #[serde(default)]
    pub risk_report: Option<Value>,
    #[serde(default)]
    pub user_focus: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryResponse {
    pub ok: bool,
    pub content: String,
    /// The context the answer was grounded on (RAG only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}
