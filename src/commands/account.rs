//! Liveness and current-user endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::queries;
use crate::models::Role;
use crate::server::{ApiError, AppState, Requester};

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Company name, if the user belongs to one
    pub company: Option<String>,
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> Result<Json<UserResponse>, ApiError> {
    let company = match requester.user.company_id {
        Some(company_id) => {
            let conn = state.db().lock()?;
            queries::select_company(&conn, company_id)?.map(|c| c.name)
        }
        None => None,
    };

    let user = requester.user;
    Ok(Json(UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        company,
    }))
}
