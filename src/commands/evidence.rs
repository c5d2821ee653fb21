//! Evidence commands
//!
//! Handles listing, upload (with inline compliance evaluation) and soft delete

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::db::queries;
use crate::engine::EngineError;
use crate::models::{AuditEvent, AuditEventType, ComplianceCheck, Control, Evidence};
use crate::security::sanitize_file_name;
use crate::server::{ApiError, AppState, Requester};
use crate::utils::record_audit_event;

/// Live evidence of the caller's company, newest first
pub async fn list_evidence(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> Result<Json<Vec<Evidence>>, ApiError> {
    let company_id = requester.company_id()?;
    let conn = state.db().lock()?;

    Ok(Json(queries::select_evidence_list(&conn, company_id)?))
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Control id the evidence supports
    pub control: i64,
    pub name: String,
    pub file_name: String,
    /// Screenshot bytes, base64-encoded
    pub file_base64: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub evidence: Evidence,
    /// Outcome of the inline evaluation, when it ran to completion
    pub compliance_check: Option<ComplianceCheck>,
    /// Why the inline evaluation did not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_error: Option<String>,
}

/// Store a screenshot as evidence and evaluate it immediately
///
/// The upload succeeds even when the evaluation fails.
pub async fn upload_evidence(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let company_id = requester.company_id()?;
    let Json(req) = payload?;

    if req.name.trim().is_empty() || req.file_base64.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Missing required fields: file, control, name".to_string(),
        ));
    }
    sanitize_file_name(&req.file_name)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let bytes = BASE64
        .decode(req.file_base64.trim())
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid file base64: {}", e)))?;

    let control = {
        let conn = state.db().lock()?;
        queries::select_control_for_company(&conn, company_id, req.control)?
            .ok_or_else(|| EngineError::not_found("Control", req.control))?
    };

    let file = state
        .engine
        .media()
        .save(company_id, &req.file_name, &bytes)
        .await?;

    let evidence_id = match record_upload(&state, &control, req.name.trim(), &file, bytes.len(), requester.user.id) {
        Ok(evidence_id) => evidence_id,
        Err(e) => {
            // The row never landed, so nothing references the stored file
            if let Err(cleanup) = state.engine.media().remove(&file).await {
                tracing::warn!(file = %file, "Failed to remove orphaned evidence file: {}", cleanup);
            }
            return Err(e);
        }
    };

    tracing::info!(evidence_id, control_id = control.id, "Evidence uploaded");

    let (compliance_check, compliance_error) = match state.engine.evaluate(company_id, evidence_id).await {
        Ok(check) => (Some(check), None),
        Err(e) => {
            tracing::warn!(evidence_id, "Inline evaluation failed: {}", e);
            (None, Some(e.to_string()))
        }
    };

    let evidence = {
        let conn = state.db().lock()?;
        queries::select_evidence(&conn, evidence_id)?
            .ok_or_else(|| EngineError::not_found("Evidence", evidence_id))?
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            evidence,
            compliance_check,
            compliance_error,
        }),
    ))
}

/// Insert the evidence row for a stored file and audit the upload
fn record_upload(
    state: &AppState,
    control: &Control,
    name: &str,
    file: &str,
    size: usize,
    user_id: i64,
) -> Result<i64, ApiError> {
    let conn = state.db().lock()?;
    let evidence_id = queries::insert_evidence(&conn, control, name, file, user_id)?;

    let event = AuditEvent::new(
        AuditEventType::EvidenceUploaded,
        control.company_id,
        format!("Evidence '{}' uploaded for control {}", name, control.id),
    )
    .with_evidence_id(evidence_id)
    .with_control_id(control.id)
    .with_metadata(json!({ "file": file, "bytes": size }));
    record_audit_event(&conn, &event);

    Ok(evidence_id)
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted: Vec<i64>,
}

/// Soft-delete evidence; ids outside the caller's company are ignored
pub async fn delete_evidence(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let company_id = requester.company_id()?;
    let Json(req) = payload?;

    if req.ids.is_empty() {
        return Err(ApiError::InvalidRequest("No evidence IDs provided".to_string()));
    }

    let conn = state.db().lock()?;
    let deleted = queries::soft_delete_evidence(&conn, company_id, &req.ids)?;

    for id in &deleted {
        let event = AuditEvent::new(
            AuditEventType::EvidenceDeleted,
            company_id,
            format!("Evidence {} deleted by {}", id, requester.user.username),
        )
        .with_evidence_id(*id);
        record_audit_event(&conn, &event);
    }

    Ok(Json(DeleteResponse {
        message: format!("Deleted {} evidence records", deleted.len()),
        deleted,
    }))
}
