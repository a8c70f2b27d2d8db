//! Pipeline API Handlers
//!
//! HTTP endpoints that trigger pipeline runs. A run that reached the
//! process-exit boundary always answers 200; its `ok` flag carries success.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use openrisk_core::domain::pipeline::PipelineRunResult;
use openrisk_core::dto::pipeline::{IngestRepo, ModelSelector, StepRunResponse};
use openrisk_runner::StepReport;
use serde_json::Value;

use crate::api::body::LenientJson;
use crate::api::error::ApiResult;
use crate::service::pipeline_service;
use crate::state::AppState;

fn step_response(report: StepReport) -> StepRunResponse {
    StepRunResponse {
        ok: report.ok(),
        code: report.exit_code,
        output: report.output,
    }
}

/// The step's own JSON when it exited cleanly and printed valid JSON,
/// otherwise the generic step response
fn json_passthrough(report: StepReport) -> Response {
    if report.exit_code == Some(0) {
        if let Ok(value) = serde_json::from_str::<Value>(report.output.trim()) {
            return Json(value).into_response();
        }
        tracing::debug!("Step '{}' output is not JSON", report.label);
    }

    Json(step_response(report)).into_response()
}

/// POST /api/pipeline/ingest
/// Full ingestion of one repository
pub async fn ingest(
    State(state): State<AppState>,
    LenientJson(req): LenientJson<IngestRepo>,
) -> ApiResult<Json<PipelineRunResult>> {
    tracing::info!("Ingest requested for: {}", req.repo_name);

    let result = pipeline_service::ingest(&state, &req.repo_name).await?;
    Ok(Json(result))
}

/// POST /api/pipeline/train
pub async fn train(
    State(state): State<AppState>,
    LenientJson(req): LenientJson<ModelSelector>,
) -> ApiResult<Json<StepRunResponse>> {
    let report = pipeline_service::train(&state, req.model_type()).await?;
    Ok(Json(step_response(report)))
}

/// POST /api/pipeline/predict
pub async fn predict(
    State(state): State<AppState>,
    LenientJson(req): LenientJson<ModelSelector>,
) -> ApiResult<Json<PipelineRunResult>> {
    let result = pipeline_service::predict(&state, req.model_type()).await?;
    Ok(Json(result))
}

/// POST /api/pipeline/signals-run
pub async fn run_signals(State(state): State<AppState>) -> ApiResult<Json<StepRunResponse>> {
    let report = pipeline_service::run_signals(&state).await?;
    Ok(Json(step_response(report)))
}

/// GET /api/pipeline/status
pub async fn status(State(state): State<AppState>) -> ApiResult<Response> {
    let report = pipeline_service::status(&state).await?;
    Ok(json_passthrough(report))
}

/// GET /api/pipeline/predictions?model_type=
pub async fn predictions(
    State(state): State<AppState>,
    Query(query): Query<ModelSelector>,
) -> ApiResult<Response> {
    let report = pipeline_service::predictions(&state, query.model_type()).await?;
    Ok(json_passthrough(report))
}
