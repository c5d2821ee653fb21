//! Control commands
//!
//! Listing is open to every member of a company; status changes are admin-only.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::db::queries;
use crate::engine::EngineError;
use crate::models::{AuditEvent, AuditEventType, Control, ControlStatus};
use crate::server::{ApiError, AppState, Requester};
use crate::utils::record_audit_event;

/// Live controls of the caller's company
pub async fn list_controls(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> Result<Json<Vec<Control>>, ApiError> {
    let company_id = requester.company_id()?;
    let conn = state.db().lock()?;

    Ok(Json(queries::select_controls(&conn, company_id)?))
}

#[derive(Debug, Deserialize)]
pub struct ControlStatusRequest {
    pub id: i64,
    pub status: String,
}

/// Set a control's status by hand
pub async fn update_control_status(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    payload: Result<Json<ControlStatusRequest>, JsonRejection>,
) -> Result<Json<Control>, ApiError> {
    requester.require_admin()?;
    let company_id = requester.company_id()?;
    let Json(req) = payload?;

    let status = ControlStatus::from_str(&req.status)
        .ok_or_else(|| EngineError::InvalidStatus(req.status.clone()))?;

    let conn = state.db().lock()?;
    let control = queries::select_control_for_company(&conn, company_id, req.id)?
        .ok_or_else(|| EngineError::not_found("Control", req.id))?;

    queries::update_control_status(&conn, control.id, status)?;

    let event = AuditEvent::new(
        AuditEventType::ControlStatusChanged,
        company_id,
        format!("Control {} set to {} by {}", control.id, status.as_str(), requester.user.username),
    )
    .with_control_id(control.id)
    .with_metadata(json!({ "from": control.status.as_str(), "to": status.as_str() }));
    record_audit_event(&conn, &event);

    let updated = queries::select_control(&conn, control.id)?
        .ok_or_else(|| EngineError::not_found("Control", control.id))?;

    Ok(Json(updated))
}
