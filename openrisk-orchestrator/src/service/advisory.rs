//! Advisory Service
//!
//! Pass-through to the text-generation provider. The service assembles the
//! context, pins the prompt contract and returns whatever the provider says.
//! The provider is told to answer strictly from the supplied context.

use openrisk_client::{ChatMessage, ClientError};
use openrisk_core::domain::metric::MetricSummary;
use openrisk_core::domain::registry::RepoName;
use openrisk_core::dto::advisory::{AdviseRequest, RagQuestion};
use serde_json::{Value, json};
use thiserror::Error;

use crate::repository::risk_report_repository;
use crate::service::cache::{self as cache_service, CacheServiceError};
use crate::state::AppState;

/// Most metrics included in a question's context
pub const CONTEXT_METRIC_LIMIT: usize = 24;

const RAG_TEMPERATURE: f64 = 0.2;
const ADVISE_TEMPERATURE: f64 = 0.3;

const RAG_SYSTEM_PROMPT: &str = "You are a repository data assistant. Answer only from the \
    provided context JSON. If the data needed to answer is missing, say so clearly. Never \
    invent facts. Do not output emojis.";

const ADVISE_SYSTEM_PROMPT: &str = "You are a governance action generator. Use only the \
    provided RiskReport JSON as evidence and do not introduce new facts. If needs_review is \
    true or model_uncertainty is high, state first that human review is required. Do not \
    output emojis.";

/// Service error type
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// No provider credential configured
    #[error("missing_api_key")]
    MissingApiKey,

    #[error("invalid_payload")]
    InvalidPayload,

    #[error("invalid_risk_report")]
    InvalidRiskReport,

    #[error("{0}")]
    Provider(String),
}

impl From<ClientError> for AdvisoryError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::MissingApiKey => AdvisoryError::MissingApiKey,
            ClientError::ApiError { message, .. } => AdvisoryError::Provider(message),
            other => AdvisoryError::Provider(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisoryError>;

/// A grounded answer and the context it was grounded on
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub content: String,
    pub context: Value,
}

fn ensure_credential(state: &AppState) -> Result<()> {
    if state.provider.has_api_key() {
        Ok(())
    } else {
        Err(AdvisoryError::MissingApiKey)
    }
}

/// Metric view used in question context, busiest metrics first
fn metrics_context(mut metrics: Vec<MetricSummary>) -> Value {
    metrics.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));
    metrics.truncate(CONTEXT_METRIC_LIMIT);

    let entries: Vec<Value> = metrics
        .into_iter()
        .map(|m| {
            json!({
                "name": m.name,
                "latest_period": m.latest_period,
                "latest_value": m.latest_value,
                "points": m.points,
                "series_tail": m.series,
            })
        })
        .collect();

    json!({
        "metric_count": entries.len(),
        "metrics": entries,
    })
}

/// Everything known about `name`: its risk report item and cached metrics
///
/// Missing pieces are `null`.
pub async fn build_context(state: &AppState, name: &RepoName) -> Value {
    let repo = name.to_string();
    let risk_report =
        risk_report_repository::find_item(&state.config.risk_report_path(), &repo).await;

    let raw_metrics = match cache_service::project(state, name).await {
        Ok(metrics) => Some(metrics_context(metrics)),
        Err(CacheServiceError::NotFound(_)) => None,
        Err(e) => {
            tracing::warn!("Metrics unavailable for {} context: {}", repo, e);
            None
        }
    };

    json!({
        "repo": repo,
        "risk_report": risk_report,
        "raw_metrics": raw_metrics,
    })
}

/// Answer a question about one repository from its own data
pub async fn rag(state: &AppState, req: RagQuestion) -> Result<RagAnswer> {
    ensure_credential(state)?;

    let question = req.question.trim();
    let name: RepoName = req.repo.parse().map_err(|_| AdvisoryError::InvalidPayload)?;
    if question.is_empty() {
        return Err(AdvisoryError::InvalidPayload);
    }

    let context = build_context(state, &name).await;
    let context_json = serde_json::to_string_pretty(&context)
        .map_err(|e| AdvisoryError::Provider(e.to_string()))?;

    let user_prompt = format!(
        "Context JSON:\n{context_json}\n\nUser question:\n{question}\n\n\
         Answer in Chinese with clear bullet points if applicable."
    );
    let messages = vec![
        ChatMessage::system(RAG_SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ];

    tracing::info!("Advisory question for {}", name);
    let content = state
        .provider
        .complete(messages, RAG_TEMPERATURE)
        .await
        .inspect_err(|e| tracing::error!("Provider failed for {}: {}", name, e))?;

    Ok(RagAnswer { content, context })
}

/// Governance actions derived from one risk report
pub async fn advise(state: &AppState, req: AdviseRequest) -> Result<String> {
    ensure_credential(state)?;

    let report = req
        .risk_report
        .filter(|r| {
            r.get("repo")
                .is_some_and(|repo| !repo.is_null() && repo.as_str() != Some(""))
        })
        .ok_or(AdvisoryError::InvalidRiskReport)?;

    let report_json = serde_json::to_string_pretty(&report)
        .map_err(|e| AdvisoryError::Provider(e.to_string()))?;
    let user_focus = req.user_focus.unwrap_or_default();

    let user_prompt = format!(
        "RiskReport JSON:\n{report_json}\n\nUser focus (optional): {user_focus}\n\n\
         Output format:\n\
         1) 风险摘要\n\
         2) 逐信号治理建议（Goal/Steps/Expected Impact/Risks）\n\
         3) 优先级与30/60/90天计划\n"
    );
    let messages = vec![
        ChatMessage::system(ADVISE_SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ];

    tracing::info!("Governance advice requested for {}", report["repo"]);
    let content = state
        .provider
        .complete(messages, ADVISE_TEMPERATURE)
        .await
        .inspect_err(|e| tracing::error!("Provider failed for advice: {}", e))?;

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::FakeProvider;
    use std::sync::Arc;

    fn state(root: &std::path::Path, provider: Arc<FakeProvider>) -> AppState {
        AppState::new(Config::default().with_project_root(root)).with_provider(provider)
    }

    #[tokio::test]
    async fn test_missing_key_checked_before_payload() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::without_key());
        let state = state(dir.path(), provider.clone());

        let err = rag(&state, RagQuestion::default()).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::MissingApiKey));

        let err = advise(&state, AdviseRequest::default()).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::MissingApiKey));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::answering("unused"));
        let state = state(dir.path(), provider.clone());

        let no_question = RagQuestion {
            repo: "acme/widgets".to_string(),
            question: "  ".to_string(),
        };
        assert!(matches!(
            rag(&state, no_question).await,
            Err(AdvisoryError::InvalidPayload)
        ));

        let bad_repo = RagQuestion {
            repo: "widgets".to_string(),
            question: "why?".to_string(),
        };
        assert!(matches!(
            rag(&state, bad_repo).await,
            Err(AdvisoryError::InvalidPayload)
        ));

        let no_repo = AdviseRequest {
            risk_report: Some(json!({"risk_level": "High"})),
            user_focus: None,
        };
        assert!(matches!(
            advise(&state, no_repo).await,
            Err(AdvisoryError::InvalidRiskReport)
        ));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_context_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::answering("grounded answer"));
        let state = state(dir.path(), provider.clone());

        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(
            state.config.risk_report_path(),
            r#"{"items":[{"repo":"acme/widgets","risk_level":"Medium","as_of":"2024-05"}]}"#,
        )
        .unwrap();

        let metrics_dir = dir.path().join("data/cache/github/acme/widgets");
        std::fs::create_dir_all(&metrics_dir).unwrap();
        for i in 0..30 {
            let series: serde_json::Map<String, Value> = (1..=(i % 12 + 1))
                .map(|m| (format!("2024-{m:02}"), json!(m)))
                .collect();
            std::fs::write(
                metrics_dir.join(format!("metric_{i:02}.json")),
                Value::Object(series).to_string(),
            )
            .unwrap();
        }

        let answer = rag(
            &state,
            RagQuestion {
                repo: "acme/widgets".to_string(),
                question: "Is activity dropping?".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(answer.content, "grounded answer");
        assert_eq!(answer.context["repo"], "acme/widgets");
        assert_eq!(answer.context["risk_report"]["risk_level"], "Medium");
        assert_eq!(answer.context["risk_report"]["as_of_month"], "2024-05");

        let raw = &answer.context["raw_metrics"];
        assert_eq!(raw["metric_count"], 24);
        assert_eq!(raw["metrics"][0]["points"], 12);
        assert_eq!(raw["metrics"][23]["points"], 3);
        assert!(raw["metrics"][0]["series_tail"].is_array());

        let calls = provider.calls.lock().unwrap();
        let (messages, temperature) = &calls[0];
        assert_eq!(*temperature, 0.2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("Is activity dropping?"));
        assert!(messages[1].content.contains("\"risk_level\": \"Medium\""));
    }

    #[tokio::test]
    async fn test_context_without_data_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), Arc::new(FakeProvider::answering("")));

        let name: RepoName = "acme/widgets".parse().unwrap();
        let context = build_context(&state, &name).await;
        assert!(context["risk_report"].is_null());
        assert!(context["raw_metrics"].is_null());
    }

    #[tokio::test]
    async fn test_advise_passes_report_through() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::answering("1) summary"));
        let state = state(dir.path(), provider.clone());

        let content = advise(
            &state,
            AdviseRequest {
                risk_report: Some(json!({"repo": "acme/widgets", "needs_review": true})),
                user_focus: Some("bus factor".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(content, "1) summary");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].1, 0.3);
        assert!(calls[0].0[1].content.contains("\"needs_review\": true"));
        assert!(calls[0].0[1].content.contains("User focus (optional): bus factor"));
    }

    #[tokio::test]
    async fn test_provider_error_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), Arc::new(FakeProvider::failing(429, "rate limited")));

        let err = advise(
            &state,
            AdviseRequest {
                risk_report: Some(json!({"repo": "acme/widgets"})),
                user_focus: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AdvisoryError::Provider(ref m) if m == "rate limited"));
    }
}
