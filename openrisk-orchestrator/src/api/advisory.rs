//! Advisory API Handlers
//!
//! Text-generation pass-through endpoints.

use axum::{Json, extract::State};
use openrisk_core::dto::advisory::{AdviseRequest, AdvisoryResponse, RagQuestion};

use crate::api::body::LenientJson;
use crate::api::error::ApiResult;
use crate::service::advisory_service;
use crate::state::AppState;

/// POST /api/advisory/rag
/// Answer a question from the repository's own data
pub async fn rag(
    State(state): State<AppState>,
    LenientJson(req): LenientJson<RagQuestion>,
) -> ApiResult<Json<AdvisoryResponse>> {
    let answer = advisory_service::rag(&state, req).await?;

    Ok(Json(AdvisoryResponse {
        ok: true,
        content: answer.content,
        context: Some(answer.context),
    }))
}

/// POST /api/advisory/advise
/// Governance actions for one risk report
pub async fn advise(
    State(state): State<AppState>,
    LenientJson(req): LenientJson<AdviseRequest>,
) -> ApiResult<Json<AdvisoryResponse>> {
    let content = advisory_service::advise(&state, req).await?;

    Ok(Json(AdvisoryResponse {
        ok: true,
        content,
        context: None,
    }))
}
