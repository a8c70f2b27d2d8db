//! API Error Handling
//!
//! Unified error type and conversion for API responses. Every error body is
//! JSON with `ok: false`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::service::advisory_service::AdvisoryError;
use crate::service::cache_service::CacheServiceError;
use crate::service::pipeline_service::PipelineError;
use crate::service::registry_service::RegistryServiceError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request; carries the error code returned to the caller
    BadRequest(String),
    /// The repository has no cache directory
    CacheNotFound(String),
    /// Another run holds the lock
    RunInProgress,
    MissingApiKey,
    /// The text-generation provider failed
    Upstream(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(error) => {
                (StatusCode::BAD_REQUEST, json!({ "ok": false, "error": error }))
            }
            ApiError::CacheNotFound(repo) => (
                StatusCode::NOT_FOUND,
                json!({ "ok": false, "error": "cache_not_found", "repo": repo }),
            ),
            ApiError::RunInProgress => (
                StatusCode::CONFLICT,
                json!({ "ok": false, "error": "run_in_progress" }),
            ),
            ApiError::MissingApiKey => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "error": "missing_api_key" }),
            ),
            ApiError::Upstream(error) => {
                tracing::error!("Provider error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": error }),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": msg }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<RegistryServiceError> for ApiError {
    fn from(err: RegistryServiceError) -> Self {
        match err {
            RegistryServiceError::InvalidName(_) => ApiError::BadRequest("invalid_repo_name".into()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<CacheServiceError> for ApiError {
    fn from(err: CacheServiceError) -> Self {
        match err {
            CacheServiceError::InvalidName(_) => ApiError::BadRequest("invalid_repo_name".into()),
            CacheServiceError::NotFound(name) => ApiError::CacheNotFound(name.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidName(_) => ApiError::BadRequest("invalid_repo_name".into()),
            PipelineError::Busy(_) => ApiError::RunInProgress,
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<AdvisoryError> for ApiError {
    fn from(err: AdvisoryError) -> Self {
        match err {
            AdvisoryError::MissingApiKey => ApiError::MissingApiKey,
            AdvisoryError::InvalidPayload => ApiError::BadRequest("invalid_payload".into()),
            AdvisoryError::InvalidRiskReport => {
                ApiError::BadRequest("invalid_risk_report".into())
            }
            AdvisoryError::Provider(message) => ApiError::Upstream(message),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
