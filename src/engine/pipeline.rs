//! Evaluation and retry
//!
//! States: `pending -> processing -> {approved | rejected | error}`.
//! `rejected` and `error` may be re-entered; `approved` is final.

use anyhow::Context;
use serde_json::json;

use super::{ComplianceEngine, EngineError};
use crate::classifier::{
    recommendations_for, ClassificationResult, Classifier, ClassifierError, ControlKind,
};
use crate::db::queries;
use crate::models::{
    is_same_tenant, AuditEvent, AuditEventType, CheckStatus, ComplianceCheck, Control,
    ControlStatus, Evidence, EvidenceStatus,
};
use crate::utils::record_audit_event;

const NO_FILE_REASON: &str = "No file attached to evidence";

/// A check this caller moved to `processing`
struct Claim {
    check_id: i64,
    stamp: String,
    evidence: Evidence,
    control: Control,
}

enum Outcome {
    Classified(ClassificationResult),
    Failed(String),
}

impl ComplianceEngine {
    /// Evaluate one evidence item and persist the verdict
    ///
    /// Classifier failures end as an `error` check rather than an `Err`.
    ///
    /// # Errors
    /// - `NotFound` when the evidence is absent, deleted or belongs to another tenant
    /// - `AlreadyInProgress` when another evaluation holds the check
    /// - `MissingArtifact` when the evidence has no file (the check is left in `error`)
    pub async fn evaluate(&self, company_id: i64, evidence_id: i64) -> Result<ComplianceCheck, EngineError> {
        // Phase 1: resolve and claim (lock released before any await)
        let claim = {
            let conn = self.db.lock()?;

            let evidence = queries::select_evidence_for_company(&conn, company_id, evidence_id)?
                .ok_or_else(|| EngineError::not_found("Evidence", evidence_id))?;
            let control = queries::select_control(&conn, evidence.control_id)?
                .ok_or_else(|| EngineError::not_found("Control", evidence.control_id))?;

            let check = queries::get_or_create_check(&conn, evidence.id)?;
            if !check.status.is_claimable() {
                if check.status == CheckStatus::Approved {
                    tracing::debug!(evidence_id, check_id = check.id, "Evidence already approved, skipping evaluation");
                    return Ok(check);
                }
                return Err(EngineError::AlreadyInProgress);
            }

            let stamp = queries::claim_check(&conn, check.id)?
                .ok_or(EngineError::AlreadyInProgress)?;

            tracing::info!(evidence_id, check_id = check.id, "Claimed compliance check");

            Claim {
                check_id: check.id,
                stamp,
                evidence,
                control,
            }
        };

        let kind = ControlKind::from_control_name(&claim.control.name);

        if !claim.evidence.has_file() {
            tracing::warn!(evidence_id, "Evidence has no file, recording error");
            self.record_outcome(&claim, kind, Outcome::Failed(NO_FILE_REASON.to_string()))?;
            return Err(EngineError::MissingArtifact);
        }

        // Phase 2: classify (no lock held)
        let outcome = match self.media.read(&claim.evidence.file).await {
            Ok(image) => match self.classify(&image, kind).await {
                Ok(result) => Outcome::Classified(result),
                Err(e) => {
                    tracing::warn!(evidence_id, kind = kind.as_str(), "Classification failed: {}", e);
                    Outcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                tracing::warn!(evidence_id, "Evidence file unreadable: {:#}", e);
                Outcome::Failed(format!("Failed to read evidence file: {:#}", e))
            }
        };

        // Phase 3: commit verdict and side effects
        self.record_outcome(&claim, kind, outcome)
    }

    /// Reset a finished (or stuck) check to `pending` and evaluate it again
    ///
    /// # Errors
    /// - `NotFound` when the check is out of the caller's tenant
    /// - `NotRetryable` when the check is approved, pending, or still fresh in `processing`
    /// - `AlreadyInProgress` when another caller reset or claimed it first
    pub async fn retry(&self, company_id: i64, check_id: i64) -> Result<ComplianceCheck, EngineError> {
        let evidence_id = {
            let conn = self.db.lock()?;

            let check = queries::select_check(&conn, check_id)?
                .filter(|check| is_same_tenant(check, company_id))
                .ok_or_else(|| EngineError::not_found("Compliance check", check_id))?;
            queries::select_evidence_for_company(&conn, company_id, check.evidence_id)?
                .ok_or_else(|| EngineError::not_found("Compliance check", check_id))?;

            let retryable = match check.status {
                CheckStatus::Rejected | CheckStatus::Error => true,
                CheckStatus::Processing => check.is_stale(chrono::Utc::now(), self.stale_threshold()),
                CheckStatus::Pending | CheckStatus::Approved => false,
            };
            if !retryable {
                return Err(EngineError::NotRetryable(check.status.as_str().to_string()));
            }

            if !queries::reset_check_for_retry(&conn, check.id, check.status, &check.updated_at)? {
                return Err(EngineError::AlreadyInProgress);
            }

            tracing::info!(check_id, from = check.status.as_str(), "Compliance check reset for retry");

            let event = AuditEvent::new(
                AuditEventType::ComplianceRetried,
                company_id,
                format!("Compliance check {} retried from {}", check.id, check.status.as_str()),
            )
            .with_evidence_id(check.evidence_id);
            record_audit_event(&conn, &event);

            check.evidence_id
        };

        self.evaluate(company_id, evidence_id).await
    }

    /// Call the configured classifier under the timeout, substituting the
    /// offline classifier when no service is configured
    async fn classify(&self, image: &[u8], kind: ControlKind) -> Result<ClassificationResult, ClassifierError> {
        let call = self.classifier.classify(image, kind);

        match tokio::time::timeout(self.classify_timeout, call).await {
            Err(_) => Err(ClassifierError::Timeout(self.classify_timeout.as_secs())),
            Ok(Err(ClassifierError::NotConfigured)) => {
                tracing::info!(kind = kind.as_str(), "AI service not configured, using offline classifier");
                self.fallback.classify(image, kind).await
            }
            Ok(result) => result,
        }
    }

    fn stale_threshold(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.stale_after)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100))
    }

    /// Write the final check state, evidence/control promotion and audit
    /// event in one transaction
    fn record_outcome(
        &self,
        claim: &Claim,
        kind: ControlKind,
        outcome: Outcome,
    ) -> Result<ComplianceCheck, EngineError> {
        let (status, analysis, reason, recommendations) = match outcome {
            Outcome::Classified(result) => {
                let status = if result.is_compliant {
                    CheckStatus::Approved
                } else {
                    CheckStatus::Rejected
                };
                let reason = if result.is_compliant {
                    String::new()
                } else {
                    result.reasoning.clone()
                };
                let recommendations = recommendations_for(result.is_compliant, kind);
                let analysis = serde_json::to_value(&result)
                    .context("Failed to serialize classification")?;
                (status, Some(analysis), reason, recommendations)
            }
            Outcome::Failed(message) => (CheckStatus::Error, None, message, Vec::new()),
        };

        let mut conn = self.db.lock()?;
        let tx = conn
            .transaction()
            .context("Failed to start verdict transaction")?;

        let applied = queries::finish_check(
            &tx,
            claim.check_id,
            &claim.stamp,
            status,
            analysis.as_ref(),
            &reason,
            &recommendations,
        )?;

        if applied {
            if status == CheckStatus::Approved {
                queries::update_evidence_status(&tx, claim.evidence.id, EvidenceStatus::Approved)?;
                if claim.control.status != ControlStatus::Implemented {
                    queries::update_control_status(&tx, claim.control.id, ControlStatus::Implemented)?;
                }
            }

            let event = AuditEvent::new(
                AuditEventType::ComplianceEvaluated,
                claim.evidence.company_id,
                format!("Evidence {} evaluated as {}", claim.evidence.id, status.as_str()),
            )
            .with_evidence_id(claim.evidence.id)
            .with_control_id(claim.control.id)
            .with_metadata(json!({
                "check_id": claim.check_id,
                "status": status.as_str(),
                "control_kind": kind.as_str(),
                "confidence": analysis.as_ref().and_then(|a| a.get("confidence")).cloned(),
            }));
            queries::insert_audit_event(&tx, &event)?;

            tx.commit().context("Failed to commit verdict")?;

            tracing::info!(
                evidence_id = claim.evidence.id,
                check_id = claim.check_id,
                status = status.as_str(),
                "Compliance verdict recorded"
            );
        } else {
            tx.rollback().context("Failed to roll back verdict")?;
            tracing::warn!(
                check_id = claim.check_id,
                "Compliance check was reclaimed before the verdict landed, discarding it"
            );
        }

        queries::select_check(&conn, claim.check_id)?
            .ok_or_else(|| EngineError::not_found("Compliance check", claim.check_id))
    }
}
