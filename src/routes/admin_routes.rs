//! Admin-only endpoints. The services check the role again; the early
//! `require_admin` on read routes keeps projections from being computed for
//! callers who cannot see them.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use validator::Validate;

use crate::dto::equipment_dto::{
    AddEquipmentRequest, AddZoneRequest, ForceCheckInRequest, MaintenanceRequest,
    OverrideStatusRequest, WorkedRequest,
};
use crate::dto::user_dto::{BulkCreateRequest, CreateUserRequest, EditUserRequest, ResetPasswordRequest};
use crate::dto::ApiResponse;
use crate::middleware::SessionUser;
use crate::models::{ActiveTrip, UserSummary};
use crate::services::{BulkCreateReport, Dashboard};
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/active-trips", get(active_trips))
        .route("/force-checkin", post(force_check_in))
        .route("/maintenance", post(set_maintenance))
        .route("/override-status", post(override_status))
        .route("/worked", post(set_worked))
        .route("/equipment", post(add_equipment))
        .route("/equipment/:id", delete(remove_equipment))
        .route("/zones", post(add_zone))
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users).post(create_user))
        .route("/users/bulk", post(bulk_create_users))
        .route("/users/:username", put(edit_user).delete(delete_user))
        .route("/users/:username/password", post(reset_password))
}

type MessageResponse = AppResult<Json<ApiResponse<()>>>;

async fn active_trips(
    State(state): State<AppState>,
    user: SessionUser,
) -> AppResult<Json<ApiResponse<Vec<ActiveTrip>>>> {
    user.require_admin()?;
    let trips = state.projections.active_trips_newest_first().await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn force_check_in(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<ForceCheckInRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state
        .coordinator
        .force_check_in(user.identity(), request.trip_id.trim())
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn set_maintenance(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<MaintenanceRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state
        .coordinator
        .set_maintenance(
            user.identity(),
            request.equipment_id.trim(),
            request.action,
            request.reason,
        )
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn override_status(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<OverrideStatusRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state
        .coordinator
        .override_status(user.identity(), request.equipment_id.trim(), request.status)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn set_worked(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<WorkedRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state
        .coordinator
        .set_trip_worked(user.identity(), request.trip_id.trim(), request.worked)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn add_equipment(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<AddEquipmentRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state
        .coordinator
        .add_equipment(user.identity(), request.equipment_id.trim(), request.store_only)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn remove_equipment(
    State(state): State<AppState>,
    user: SessionUser,
    Path(equipment_id): Path<String>,
) -> MessageResponse {
    let message = state
        .coordinator
        .remove_equipment(user.identity(), equipment_id.trim())
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn add_zone(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<AddZoneRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state.coordinator.add_zone(user.identity(), &request.name).await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn dashboard(
    State(state): State<AppState>,
    user: SessionUser,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    user.require_admin()?;
    let dashboard = state.projections.dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

async fn list_users(
    State(state): State<AppState>,
    user: SessionUser,
) -> AppResult<Json<ApiResponse<Vec<UserSummary>>>> {
    let users = state.users.list_users(user.identity()).await?;
    Ok(Json(ApiResponse::success(users)))
}

async fn create_user(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<CreateUserRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state.users.add_user(user.identity(), request.into()).await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn edit_user(
    State(state): State<AppState>,
    user: SessionUser,
    Path(username): Path<String>,
    Json(request): Json<EditUserRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state
        .users
        .edit_user(user.identity(), &username, request.role, &request.carrier)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn delete_user(
    State(state): State<AppState>,
    user: SessionUser,
    Path(username): Path<String>,
) -> MessageResponse {
    let message = state.users.delete_user(user.identity(), &username).await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn reset_password(
    State(state): State<AppState>,
    user: SessionUser,
    Path(username): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> MessageResponse {
    request.validate()?;
    let message = state
        .users
        .reset_password(user.identity(), &username, &request.new_password)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn bulk_create_users(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<BulkCreateRequest>,
) -> AppResult<Json<ApiResponse<BulkCreateReport>>> {
    request.validate()?;
    let report = state.users.bulk_create(user.identity(), &request.csv_data).await?;
    let message = report.message();
    Ok(Json(ApiResponse::success_with_message(report, message)))
}
