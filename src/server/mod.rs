//! HTTP surface
//!
//! Routes map one-to-one onto the handlers in [`crate::commands`].

pub mod auth;
pub mod error;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::commands;

pub use auth::Requester;
pub use error::ApiError;
pub use state::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(commands::account::health))
        .route("/api/ping", get(commands::account::ping))
        .route("/api/user", get(commands::account::get_user))
        // Controls
        .route("/api/controls", get(commands::control::list_controls))
        .route("/api/controls/status", post(commands::control::update_control_status))
        // Evidence
        .route("/api/evidence", get(commands::evidence::list_evidence))
        .route("/api/evidence/upload", post(commands::evidence::upload_evidence))
        .route("/api/evidence/delete", post(commands::evidence::delete_evidence))
        // Compliance checks
        .route("/api/compliance/check", post(commands::compliance::check_evidence))
        .route("/api/compliance/status/:evidence_id", get(commands::compliance::get_status))
        .route("/api/compliance/checks", get(commands::compliance::list_checks))
        .route("/api/compliance/retry/:compliance_check_id", post(commands::compliance::retry_check))
        .route("/api/compliance/ai-status", get(commands::compliance::ai_status))
        // External reviewer
        .route("/api/webhook/verdict", post(commands::webhook::apply_verdict))
        .route("/api/audit", get(commands::audit::get_audit_events))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
