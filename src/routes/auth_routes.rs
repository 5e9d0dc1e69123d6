use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::dto::auth_dto::{ChangePasswordRequest, LoginRequest, LoginResponse};
use crate::dto::ApiResponse;
use crate::middleware::{bearer_token, SessionUser};
use crate::services::{ActiveDriver, LoginAttempt};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/password", post(change_password))
        .route("/active-drivers", get(active_drivers))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    request.validate()?;

    let attempt = LoginAttempt {
        username: request.username.trim().to_string(),
        password: request.password,
        latitude: request.latitude,
        longitude: request.longitude,
    };
    let session = state
        .auth
        .login(attempt)
        .await?
        .ok_or_else(|| AppError::Rejected("Invalid username or password.".to_string()))?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token: session.token,
        username: session.identity.username,
        role: session.identity.role,
        expires_at: session.expires_at,
    })))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<ApiResponse<()>> {
    if let Some(token) = bearer_token(&headers) {
        state.auth.logout(token).await;
    }
    Json(ApiResponse::message("Logged out.".to_string()))
}

async fn change_password(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    request.validate()?;
    let message = state
        .auth
        .change_password(user.identity(), &request.current_password, &request.new_password)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

/// Login screen helper, no session required.
async fn active_drivers(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<ActiveDriver>>>> {
    let drivers = state.projections.active_drivers().await?;
    Ok(Json(ApiResponse::success(drivers)))
}
