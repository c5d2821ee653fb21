//! Compliance decision engine
//!
//! Orchestrates one evaluation per evidence item: resolve the evidence inside
//! the caller's tenant, claim its compliance check, classify the screenshot,
//! then commit the verdict and its side effects in a single transaction.
//!
//! Database work happens in short synchronous phases. The connection lock is
//! always released before the classifier is awaited.

pub mod error;
mod pipeline;
mod verdict;

use std::sync::Arc;
use std::time::Duration;

use crate::classifier::{Classifier, ClassifierConfig, OfflineClassifier, VisionClient};
use crate::db::{queries, Database};
use crate::models::{is_same_tenant, ComplianceCheck, ComplianceCheckSummary};
use crate::storage::MediaStore;
use crate::utils::env::DEFAULT_STALE_AFTER_SECS;

pub use error::EngineError;
pub use verdict::VerdictOutcome;

pub struct ComplianceEngine {
    db: Database,
    media: MediaStore,
    classifier: Arc<dyn Classifier>,
    fallback: OfflineClassifier,
    classify_timeout: Duration,
    stale_after: Duration,
}

impl ComplianceEngine {
    pub fn new(db: Database, media: MediaStore, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            db,
            media,
            classifier,
            fallback: OfflineClassifier,
            classify_timeout: Duration::from_secs(ClassifierConfig::MIN_TIMEOUT_SECS),
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
        }
    }

    /// Engine backed by the remote vision service described by `config`
    pub fn with_vision_client(
        db: Database,
        media: MediaStore,
        config: ClassifierConfig,
    ) -> anyhow::Result<Self> {
        let timeout = config.timeout;
        let client = VisionClient::new(config)?;
        Ok(Self::new(db, media, Arc::new(client)).with_classify_timeout(timeout))
    }

    /// Upper bound on one classifier call
    pub fn with_classify_timeout(mut self, timeout: Duration) -> Self {
        self.classify_timeout = timeout;
        self
    }

    /// Age after which a `processing` check may be reclaimed by retry
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Current compliance check for an evidence item in the caller's tenant
    pub fn status(&self, company_id: i64, evidence_id: i64) -> Result<ComplianceCheck, EngineError> {
        let conn = self.db.lock()?;

        queries::select_evidence_for_company(&conn, company_id, evidence_id)?
            .ok_or_else(|| EngineError::not_found("Evidence", evidence_id))?;

        queries::select_check_for_evidence(&conn, evidence_id)?
            .filter(|check| is_same_tenant(check, company_id))
            .ok_or_else(|| EngineError::not_found("Compliance check for evidence", evidence_id))
    }

    /// Every compliance check of the tenant, with evidence and control names
    pub fn list_checks(&self, company_id: i64) -> Result<Vec<ComplianceCheckSummary>, EngineError> {
        let conn = self.db.lock()?;
        Ok(queries::select_checks_for_company(&conn, company_id)?)
    }
}
