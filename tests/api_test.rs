//! HTTP API tests
//!
//! Drive the router in-process and check status codes, error bodies and
//! tenant isolation as seen by clients.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{TestEnv, SCREENSHOT};
use compliance_evidence::classifier::OfflineClassifier;
use compliance_evidence::server::router;

struct Api {
    env: TestEnv,
    app: Router,
}

impl Api {
    fn new() -> Self {
        let env = TestEnv::new(Arc::new(OfflineClassifier)).unwrap();
        let app = router(env.state.clone());
        Self { env, app }
    }

    async fn send(&self, method: Method, uri: &str, user: Option<i64>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("X-User-Id", user.to_string());
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    async fn get(&self, uri: &str, user: i64) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(user), None).await
    }

    async fn post(&self, uri: &str, user: i64, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(user), Some(body)).await
    }

    async fn upload(&self, user: i64, control: i64, name: &str) -> (StatusCode, Value) {
        self.post(
            "/api/evidence/upload",
            user,
            json!({
                "control": control,
                "name": name,
                "file_name": format!("{}.png", name),
                "file_base64": BASE64.encode(SCREENSHOT),
            }),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_and_ping_need_no_identity() {
    let api = Api::new();

    let response = api
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = api.send(Method::GET, "/api/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn test_missing_or_unknown_identity_is_forbidden() {
    let api = Api::new();

    let (status, body) = api.send(Method::GET, "/api/controls", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);

    let (status, _) = api.get("/api/controls", 999_999).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_without_company_is_rejected() {
    let api = Api::new();

    let (status, body) = api.get("/api/user", api.env.drifter_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"], Value::Null);

    let (status, body) = api.get("/api/evidence", api.env.drifter_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User is not associated with a company");
}

#[tokio::test]
async fn test_current_user_reports_company() {
    let api = Api::new();

    let (status, body) = api.get("/api/user", api.env.acme.admin_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "acme-admin");
    assert_eq!(body["role"], "admin");
    assert_eq!(body["company"], "Acme");
}

#[tokio::test]
async fn test_controls_are_tenant_scoped() {
    let api = Api::new();

    let (status, body) = api.get("/api/controls", api.env.globex.employee_id).await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&api.env.globex.mfa_control_id));
    assert!(!ids.contains(&api.env.acme.mfa_control_id));
}

#[tokio::test]
async fn test_control_status_update_requires_admin() {
    let api = Api::new();
    let acme = api.env.acme;
    let body = json!({ "id": acme.mfa_control_id, "status": "implemented" });

    let (status, _) = api.post("/api/controls/status", acme.employee_id, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = api.post("/api/controls/status", acme.admin_id, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "implemented");

    let (status, _) = api
        .post("/api/controls/status", acme.admin_id, json!({ "id": acme.mfa_control_id, "status": "done" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post(
            "/api/controls/status",
            acme.admin_id,
            json!({ "id": api.env.globex.mfa_control_id, "status": "implemented" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_evaluates_inline() {
    let api = Api::new();
    let acme = api.env.acme;

    let (status, body) = api.upload(acme.employee_id, acme.mfa_control_id, "otp-screen").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["evidence"]["name"], "otp-screen");
    assert_eq!(body["evidence"]["status"], "approved");
    assert_eq!(body["compliance_check"]["status"], "approved");
    assert!(body.get("compliance_error").is_none());

    let file = body["evidence"]["file"].as_str().unwrap();
    assert!(file.starts_with(&format!("evidence/{}/", acme.company_id)));
    assert!(file.ends_with("_otp-screen.png"));

    let (_, controls) = api.get("/api/controls", acme.employee_id).await;
    let mfa = controls
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == acme.mfa_control_id)
        .unwrap();
    assert_eq!(mfa["status"], "implemented");
}

#[tokio::test]
async fn test_upload_validation() {
    let api = Api::new();
    let acme = api.env.acme;

    let (status, _) = api
        .post(
            "/api/evidence/upload",
            acme.employee_id,
            json!({ "control": acme.mfa_control_id, "name": "x", "file_name": "x.png", "file_base64": "%%%" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post("/api/evidence/upload", acme.employee_id, json!({ "name": "missing control" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api.upload(acme.employee_id, api.env.globex.mfa_control_id, "foreign").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_insert_removes_stored_file() {
    let api = Api::new();
    let acme = api.env.acme;
    {
        let conn = api.env.db().lock().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER evidence_insert_fails BEFORE INSERT ON evidence
             BEGIN SELECT RAISE(ABORT, 'database is full'); END;",
        )
        .unwrap();
    }

    let (status, body) = api.upload(acme.employee_id, acme.mfa_control_id, "otp-screen").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], 500);

    let company_dir = api
        .env
        .engine()
        .media()
        .root()
        .join(format!("evidence/{}", acme.company_id));
    let leftovers = std::fs::read_dir(&company_dir).map(|dir| dir.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_compliance_endpoints() {
    let api = Api::new();
    let acme = api.env.acme;

    let (_, uploaded) = api.upload(acme.employee_id, acme.sso_control_id, "azure").await;
    let evidence_id = uploaded["evidence"]["id"].as_i64().unwrap();

    let (status, check) = api
        .get(&format!("/api/compliance/status/{}", evidence_id), acme.employee_id)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["evidence_id"], evidence_id);
    assert_eq!(check["status"], "approved");
    let check_id = check["compliance_check_id"].as_i64().unwrap();

    let (status, list) = api.get("/api/compliance/checks", acme.employee_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["compliance_checks"].as_array().unwrap().len(), 1);
    assert_eq!(list["compliance_checks"][0]["control_name"], "SSO Login Control - Microsoft Azure AD");

    let (status, body) = api
        .post(&format!("/api/compliance/retry/{}", check_id), acme.employee_id, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("approved"));

    let (status, _) = api
        .get(&format!("/api/compliance/status/{}", evidence_id), api.env.globex.employee_id)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = api.get("/api/compliance/status/not-a-number", acme.employee_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, again) = api
        .post("/api/compliance/check", acme.employee_id, json!({ "evidence_id": evidence_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["compliance_check_id"], check_id);
}

#[tokio::test]
async fn test_ai_status_reports_offline_mode() {
    let api = Api::new();

    let (status, body) = api.get("/api/compliance/ai-status", api.env.acme.employee_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_configured"], false);
    assert_eq!(body["has_api_key"], false);
    assert_eq!(body["model"], "gemini-1.5-flash");
}

#[tokio::test]
async fn test_delete_evidence_is_soft_and_scoped() {
    let api = Api::new();
    let acme = api.env.acme;

    let (_, uploaded) = api.upload(acme.employee_id, acme.mfa_control_id, "otp").await;
    let evidence_id = uploaded["evidence"]["id"].as_i64().unwrap();

    let (status, body) = api.post("/api/evidence/delete", acme.employee_id, json!({ "ids": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No evidence IDs provided");

    let (status, body) = api
        .post("/api/evidence/delete", api.env.globex.admin_id, json!({ "ids": [evidence_id] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted 0 evidence records");

    let (status, body) = api
        .post("/api/evidence/delete", acme.employee_id, json!({ "ids": [evidence_id] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted 1 evidence records");

    let (_, list) = api.get("/api/evidence", acme.employee_id).await;
    assert!(list.as_array().unwrap().is_empty());
    assert!(api.env.evidence(evidence_id).is_deleted);
}

#[tokio::test]
async fn test_webhook_verdict() {
    let api = Api::new();
    let acme = api.env.acme;
    let evidence_id = api
        .env
        .add_evidence(&acme, acme.mfa_control_id, "otp", SCREENSHOT)
        .await
        .unwrap();

    let (status, body) = api
        .post("/api/webhook/verdict", acme.admin_id, json!({ "evidence_id": evidence_id, "status": "approved" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evidence_status"], "approved");
    assert_eq!(body["control_status"], "implemented");
    assert_eq!(body["reason"], "");

    let (status, _) = api
        .post("/api/webhook/verdict", acme.admin_id, json!({ "evidence_id": evidence_id, "status": "maybe" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_audit_trail_filters() {
    let api = Api::new();
    let acme = api.env.acme;

    api.upload(acme.employee_id, acme.mfa_control_id, "otp").await;

    let (status, all) = api.get("/api/audit", acme.admin_id).await;
    assert_eq!(status, StatusCode::OK);
    assert!(all.as_array().unwrap().len() >= 2);

    let (_, uploads) = api.get("/api/audit?event_type=evidence_uploaded", acme.admin_id).await;
    let uploads = uploads.as_array().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0]["event_type"], "evidence_uploaded");

    let (_, limited) = api.get("/api/audit?limit=1", acme.admin_id).await;
    assert_eq!(limited.as_array().unwrap().len(), 1);

    let (_, foreign) = api.get("/api/audit", api.env.globex.admin_id).await;
    assert!(foreign.as_array().unwrap().is_empty());
}
