//! Common test helpers for integration tests
//!
//! Provides an isolated environment (temporary database and media root),
//! two seeded tenants, and scripted classifiers standing in for the vision
//! service.

#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use compliance_evidence::classifier::{
    ClassificationResult, Classifier, ClassifierConfig, ClassifierError, ControlKind,
};
use compliance_evidence::db::{queries, Database};
use compliance_evidence::engine::ComplianceEngine;
use compliance_evidence::models::{ComplianceCheck, Control, Evidence, Role};
use compliance_evidence::server::AppState;
use compliance_evidence::storage::MediaStore;

/// Minimal PNG header, enough to stand in for a screenshot
pub const SCREENSHOT: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

/// Ids of one seeded company
#[derive(Debug, Clone, Copy)]
pub struct Tenant {
    pub company_id: i64,
    pub admin_id: i64,
    pub employee_id: i64,
    pub mfa_control_id: i64,
    pub sso_control_id: i64,
}

/// Isolated application environment
///
/// Each TestEnv owns a temporary directory holding the SQLite database and the
/// media root. Both are removed when the TestEnv is dropped.
pub struct TestEnv {
    #[allow(dead_code)]
    temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub acme: Tenant,
    pub globex: Tenant,
    /// Authenticated user with no company
    pub drifter_id: i64,
}

impl TestEnv {
    pub fn new(classifier: Arc<dyn Classifier>) -> Result<Self> {
        Self::with_engine(classifier, |engine| engine)
    }

    /// Build an environment, letting the caller tune the engine (timeouts, staleness)
    pub fn with_engine<F>(classifier: Arc<dyn Classifier>, tune: F) -> Result<Self>
    where
        F: FnOnce(ComplianceEngine) -> ComplianceEngine,
    {
        let temp_dir = TempDir::new()?;
        let db = Database::open(&temp_dir.path().join("compliance.db"))?;
        let media = MediaStore::new(temp_dir.path().join("media"));

        let (acme, globex, drifter_id) = {
            let conn = db.lock()?;
            let acme = seed_tenant(&conn, "Acme")?;
            let globex = seed_tenant(&conn, "Globex")?;
            let drifter_id = queries::insert_user(&conn, "drifter", "drifter@nowhere.test", None, Role::Employee)?;
            (acme, globex, drifter_id)
        };

        let engine = tune(ComplianceEngine::new(db, media, classifier));
        let state = Arc::new(AppState::new(engine, ClassifierConfig::unconfigured()));

        Ok(Self {
            temp_dir,
            state,
            acme,
            globex,
            drifter_id,
        })
    }

    pub fn engine(&self) -> &ComplianceEngine {
        &self.state.engine
    }

    pub fn db(&self) -> &Database {
        self.state.db()
    }

    /// Store `bytes` as evidence for `control_id`, without evaluating it
    pub async fn add_evidence(&self, tenant: &Tenant, control_id: i64, name: &str, bytes: &[u8]) -> Result<i64> {
        let file = self
            .engine()
            .media()
            .save(tenant.company_id, &format!("{}.png", name), bytes)
            .await?;

        let conn = self.db().lock()?;
        let control = queries::select_control(&conn, control_id)?.context("control missing")?;
        queries::insert_evidence(&conn, &control, name, &file, tenant.employee_id)
    }

    /// Evidence row with no file attached
    pub fn add_empty_evidence(&self, tenant: &Tenant, control_id: i64, name: &str) -> Result<i64> {
        let conn = self.db().lock()?;
        let control = queries::select_control(&conn, control_id)?.context("control missing")?;
        queries::insert_evidence(&conn, &control, name, "", tenant.employee_id)
    }

    pub fn check_for(&self, evidence_id: i64) -> ComplianceCheck {
        let conn = self.db().lock().unwrap();
        queries::select_check_for_evidence(&conn, evidence_id)
            .unwrap()
            .expect("compliance check should exist")
    }

    pub fn evidence(&self, id: i64) -> Evidence {
        let conn = self.db().lock().unwrap();
        queries::select_evidence(&conn, id).unwrap().expect("evidence should exist")
    }

    pub fn control(&self, id: i64) -> Control {
        let conn = self.db().lock().unwrap();
        queries::select_control(&conn, id).unwrap().expect("control should exist")
    }

    /// Number of audit events of `event_type` recorded for a company
    pub fn audit_count(&self, company_id: i64, event_type: &str) -> i64 {
        let conn = self.db().lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM audit_events WHERE company_id = ? AND event_type = ?",
            rusqlite::params![company_id, event_type],
            |row| row.get(0),
        )
        .unwrap()
    }

    /// Rewrite a check's state directly, e.g. to simulate a crashed evaluation
    pub fn force_check_state(&self, check_id: i64, status: &str, updated_at: &str) {
        let conn = self.db().lock().unwrap();
        conn.execute(
            "UPDATE compliance_checks SET status = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![status, updated_at, check_id],
        )
        .unwrap();
    }
}

fn seed_tenant(conn: &rusqlite::Connection, name: &str) -> Result<Tenant> {
    let slug = name.to_lowercase();
    let company_id = queries::insert_company(conn, name)?;
    let admin_id = queries::insert_user(
        conn,
        &format!("{}-admin", slug),
        &format!("admin@{}.test", slug),
        Some(company_id),
        Role::Admin,
    )?;
    let employee_id = queries::insert_user(
        conn,
        &format!("{}-employee", slug),
        &format!("employee@{}.test", slug),
        Some(company_id),
        Role::Employee,
    )?;
    let mfa_control_id = queries::insert_control(conn, company_id, "MFA Control - OTP Authentication", admin_id)?;
    let sso_control_id = queries::insert_control(conn, company_id, "SSO Login Control - Microsoft Azure AD", admin_id)?;

    Ok(Tenant {
        company_id,
        admin_id,
        employee_id,
        mfa_control_id,
        sso_control_id,
    })
}

pub fn compliant(reasoning: &str) -> ClassificationResult {
    ClassificationResult {
        is_compliant: true,
        confidence: 0.93,
        detected_elements: vec!["OTP input field".to_string()],
        reasoning: reasoning.to_string(),
    }
}

pub fn non_compliant(reasoning: &str) -> ClassificationResult {
    ClassificationResult {
        is_compliant: false,
        confidence: 0.4,
        detected_elements: Vec::new(),
        reasoning: reasoning.to_string(),
    }
}

/// Classifier that plays back a fixed list of replies, one per call
///
/// Each step may wait before answering. Calls past the end of the script fail
/// with a transport error.
pub struct ScriptedClassifier {
    steps: Mutex<VecDeque<(Duration, Result<ClassificationResult, ClassifierError>)>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn then(self, reply: Result<ClassificationResult, ClassifierError>) -> Self {
        self.then_after(Duration::ZERO, reply)
    }

    pub fn then_after(self, delay: Duration, reply: Result<ClassificationResult, ClassifierError>) -> Self {
        self.steps.lock().unwrap().push_back((delay, reply));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _image: &[u8], _kind: ControlKind) -> Result<ClassificationResult, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            Some((delay, reply)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Err(ClassifierError::Transport("script exhausted".to_string())),
        }
    }
}

/// Classifier that gives the same answer to every call
pub struct FixedClassifier(pub Result<ClassificationResult, ClassifierError>);

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _image: &[u8], _kind: ControlKind) -> Result<ClassificationResult, ClassifierError> {
        self.0.clone()
    }
}
