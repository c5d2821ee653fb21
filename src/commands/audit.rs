//! Audit trail commands
//!
//! Handles audit event retrieval and filtering

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::queries;
use crate::models::AuditEvent;
use crate::server::{ApiError, AppState, Requester};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Audit event filter options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilters {
    /// Comma-separated event types to keep
    pub event_type: Option<String>,
    pub evidence_id: Option<i64>,
    pub limit: Option<i64>,
}

impl AuditFilters {
    fn keeps(&self, event: &AuditEvent) -> bool {
        if let Some(ref types) = self.event_type {
            if !types.split(',').any(|t| t.trim() == event.event_type) {
                return false;
            }
        }

        if let Some(evidence_id) = self.evidence_id {
            if event.evidence_id != Some(evidence_id) {
                return false;
            }
        }

        true
    }
}

/// Audit events of the caller's company, newest first
pub async fn get_audit_events(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    filters: Result<Query<AuditFilters>, QueryRejection>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    let company_id = requester.company_id()?;
    let Query(filters) = filters?;

    let limit = filters.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let mut events = {
        let conn = state.db().lock()?;
        queries::select_audit_events(&conn, company_id, limit)?
    };
    events.retain(|event| filters.keeps(event));

    Ok(Json(events))
}
