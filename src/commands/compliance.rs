//! Compliance check commands

use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::models::{CheckStatus, ComplianceCheck, ComplianceCheckSummary};
use crate::server::{ApiError, AppState, Requester};

/// Wire view of a compliance check
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub compliance_check_id: i64,
    pub evidence_id: i64,
    pub status: CheckStatus,
    pub ai_analysis: Option<Value>,
    pub rejection_reason: String,
    pub recommendations: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ComplianceCheck> for CheckResponse {
    fn from(check: ComplianceCheck) -> Self {
        Self {
            compliance_check_id: check.id,
            evidence_id: check.evidence_id,
            status: check.status,
            ai_analysis: check.ai_analysis,
            rejection_reason: check.rejection_reason,
            recommendations: check.recommendations,
            created_at: check.created_at,
            updated_at: check.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub evidence_id: i64,
}

/// Evaluate one evidence item now
pub async fn check_evidence(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let company_id = requester.company_id()?;
    let Json(req) = payload?;

    let check = state.engine.evaluate(company_id, req.evidence_id).await?;
    Ok(Json(check.into()))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    evidence_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let company_id = requester.company_id()?;
    let Path(evidence_id) = evidence_id?;

    let check = state.engine.status(company_id, evidence_id)?;
    Ok(Json(check.into()))
}

#[derive(Debug, Serialize)]
pub struct CheckListResponse {
    pub compliance_checks: Vec<ComplianceCheckSummary>,
}

pub async fn list_checks(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> Result<Json<CheckListResponse>, ApiError> {
    let company_id = requester.company_id()?;

    Ok(Json(CheckListResponse {
        compliance_checks: state.engine.list_checks(company_id)?,
    }))
}

pub async fn retry_check(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    check_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let company_id = requester.company_id()?;
    let Path(check_id) = check_id?;

    let check = state.engine.retry(company_id, check_id).await?;
    Ok(Json(check.into()))
}

#[derive(Debug, Serialize)]
pub struct AiStatusResponse {
    pub is_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub model: String,
    pub has_api_key: bool,
}

/// Whether evaluations reach the remote vision service or the offline classifier
pub async fn ai_status(
    State(state): State<Arc<AppState>>,
    _requester: Requester,
) -> Json<AiStatusResponse> {
    let config = &state.classifier;

    Json(AiStatusResponse {
        is_configured: config.is_configured(),
        api_url: config.api_url.clone(),
        model: config.model.clone(),
        has_api_key: config.api_key.is_some(),
    })
}
