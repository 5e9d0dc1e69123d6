//! Session authentication
//!
//! `SessionUser` resolves the `Authorization: Bearer <token>` header against
//! the session store before the handler body runs.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::models::Identity;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct SessionUser(pub Identity);

impl SessionUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.0.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

/// Token from the `Authorization` header, if well formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::InvalidSession)?;
        let identity = state.auth.resolve(token).await?;
        Ok(SessionUser(identity))
    }
}
