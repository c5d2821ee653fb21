//! Verdicts pushed by an external reviewer (webhook)

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ComplianceEngine, EngineError};
use crate::db::queries;
use crate::models::{AuditEvent, AuditEventType, ControlStatus, EvidenceStatus};

/// What an external verdict changed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerdictOutcome {
    pub evidence_id: i64,
    pub evidence_status: EvidenceStatus,
    pub control_status: ControlStatus,
    pub reason: String,
}

impl ComplianceEngine {
    /// Set an evidence item's status from an outside review
    ///
    /// Approval promotes the owning control to `implemented`; rejection never
    /// demotes it.
    ///
    /// # Errors
    /// - `InvalidStatus` unless `status` is `approved` or `rejected` (checked first)
    /// - `NotFound` when the evidence is outside the caller's tenant
    pub fn apply_external_verdict(
        &self,
        company_id: i64,
        evidence_id: i64,
        status: &str,
        reason: Option<String>,
    ) -> Result<VerdictOutcome, EngineError> {
        let status = EvidenceStatus::from_str(status)
            .ok_or_else(|| EngineError::InvalidStatus(status.to_string()))?;
        let reason = reason.unwrap_or_default();

        let mut conn = self.db.lock()?;
        let tx = conn
            .transaction()
            .context("Failed to start verdict transaction")?;

        let evidence = queries::select_evidence_for_company(&tx, company_id, evidence_id)?
            .ok_or_else(|| EngineError::not_found("Evidence", evidence_id))?;
        let control = queries::select_control(&tx, evidence.control_id)?
            .ok_or_else(|| EngineError::not_found("Control", evidence.control_id))?;

        queries::update_evidence_status(&tx, evidence.id, status)?;

        let control_status = if status == EvidenceStatus::Approved && !control.is_implemented() {
            queries::update_control_status(&tx, control.id, ControlStatus::Implemented)?;
            ControlStatus::Implemented
        } else {
            control.status
        };

        let event = AuditEvent::new(
            AuditEventType::ExternalVerdict,
            company_id,
            format!("Evidence {} marked {} by external review", evidence.id, status.as_str()),
        )
        .with_evidence_id(evidence.id)
        .with_control_id(control.id)
        .with_metadata(json!({ "reason": reason }));
        queries::insert_audit_event(&tx, &event)?;

        tx.commit().context("Failed to commit external verdict")?;

        tracing::info!(
            evidence_id,
            status = status.as_str(),
            control_status = control_status.as_str(),
            "External verdict applied"
        );

        Ok(VerdictOutcome {
            evidence_id: evidence.id,
            evidence_status: status,
            control_status,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::OfflineClassifier;
    use crate::db::test_helpers::{seed_tenant, TestDbGuard};
    use crate::storage::MediaStore;
    use std::sync::Arc;

    fn engine_with_evidence(guard: &TestDbGuard) -> (ComplianceEngine, i64, i64, i64) {
        let db = guard.database().unwrap();
        let (company_id, control_id, evidence_id) = {
            let conn = db.lock().unwrap();
            let tenant = seed_tenant(&conn, "Acme");
            let control_id = queries::insert_control(&conn, tenant.company_id, "MFA", tenant.admin_id).unwrap();
            let control = queries::select_control(&conn, control_id).unwrap().unwrap();
            let evidence_id = queries::insert_evidence(&conn, &control, "otp", "", tenant.admin_id).unwrap();
            (tenant.company_id, control_id, evidence_id)
        };
        let engine = ComplianceEngine::new(
            db,
            MediaStore::new(guard.temp_dir.path()),
            Arc::new(OfflineClassifier),
        );
        (engine, company_id, control_id, evidence_id)
    }

    #[test]
    fn test_invalid_status_is_checked_first() {
        let guard = TestDbGuard::new();
        let (engine, company_id, _, _) = engine_with_evidence(&guard);

        // Unknown evidence and bad status: status wins
        let result = engine.apply_external_verdict(company_id, 9999, "maybe", None);
        assert!(matches!(result, Err(EngineError::InvalidStatus(s)) if s == "maybe"));
    }

    #[test]
    fn test_approval_promotes_and_rejection_does_not_demote() {
        let guard = TestDbGuard::new();
        let (engine, company_id, control_id, evidence_id) = engine_with_evidence(&guard);

        let approved = engine
            .apply_external_verdict(company_id, evidence_id, "approved", None)
            .unwrap();
        assert_eq!(approved.evidence_status, EvidenceStatus::Approved);
        assert_eq!(approved.control_status, ControlStatus::Implemented);
        assert_eq!(approved.reason, "");

        let rejected = engine
            .apply_external_verdict(company_id, evidence_id, "rejected", Some("blurry".to_string()))
            .unwrap();
        assert_eq!(rejected.evidence_status, EvidenceStatus::Rejected);
        assert_eq!(rejected.control_status, ControlStatus::Implemented);
        assert_eq!(rejected.reason, "blurry");

        let conn = engine.database().lock().unwrap();
        assert!(queries::select_control(&conn, control_id).unwrap().unwrap().is_implemented());
        let events = queries::select_audit_events(&conn, company_id, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].get_metadata().unwrap()["reason"], "blurry");
    }

    #[test]
    fn test_foreign_tenant_is_not_found() {
        let guard = TestDbGuard::new();
        let (engine, _, _, evidence_id) = engine_with_evidence(&guard);
        let other = seed_tenant(&engine.database().lock().unwrap(), "Globex");

        let result = engine.apply_external_verdict(other.company_id, evidence_id, "approved", None);
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
