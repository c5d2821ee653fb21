//! Caller identity
//!
//! Authentication happens upstream; the identity layer forwards the
//! authenticated user's id in the `X-User-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::db::queries;
use crate::engine::EngineError;
use crate::models::User;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user behind a request
#[derive(Debug, Clone)]
pub struct Requester {
    pub user: User,
}

impl Requester {
    /// Company the caller acts for
    ///
    /// # Errors
    /// `NoCompany` when the user is not attached to a company
    pub fn company_id(&self) -> Result<i64, ApiError> {
        self.user
            .company_id
            .ok_or_else(|| EngineError::NoCompany.into())
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.user.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Forbidden("Only admins can perform this action".to_string()).into())
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user_id: i64 = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let user = {
            let conn = state.db().lock()?;
            queries::select_user(&conn, user_id)?
        };

        user.map(|user| Requester { user })
            .ok_or(ApiError::Unauthenticated)
    }
}
