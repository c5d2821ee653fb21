use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::engine::VerdictOutcome;
use crate::server::{ApiError, AppState, Requester};

#[derive(Debug, Deserialize)]
pub struct VerdictRequest {
    pub evidence_id: i64,
    pub status: String,
    pub reason: Option<String>,
}

/// Accept a verdict from an external reviewer (e.g. a workflow automation)
pub async fn apply_verdict(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    payload: Result<Json<VerdictRequest>, JsonRejection>,
) -> Result<Json<VerdictOutcome>, ApiError> {
    let company_id = requester.company_id()?;
    let Json(req) = payload?;

    let outcome = state
        .engine
        .apply_external_verdict(company_id, req.evidence_id, &req.status, req.reason)?;

    Ok(Json(outcome))
}
