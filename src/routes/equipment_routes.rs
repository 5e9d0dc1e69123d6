use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::dto::equipment_dto::LocationUpdateRequest;
use crate::dto::ApiResponse;
use crate::middleware::SessionUser;
use crate::models::{EquipmentOverview, EquipmentStatusView};
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub fn create_equipment_router() -> Router<AppState> {
    Router::new()
        .route("/statuses", get(statuses))
        .route("/overview", get(overview))
        .route("/zones", get(zones))
        .route("/location", post(update_location))
}

async fn statuses(
    State(state): State<AppState>,
    _user: SessionUser,
) -> AppResult<Json<ApiResponse<Vec<EquipmentStatusView>>>> {
    let statuses = state.projections.equipment_statuses().await?;
    Ok(Json(ApiResponse::success(statuses)))
}

async fn overview(
    State(state): State<AppState>,
    _user: SessionUser,
) -> AppResult<Json<ApiResponse<Vec<EquipmentOverview>>>> {
    let overview = state.projections.equipment_overview().await?;
    Ok(Json(ApiResponse::success(overview)))
}

async fn zones(
    State(state): State<AppState>,
    _user: SessionUser,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let zones = state.projections.zone_options().await?;
    Ok(Json(ApiResponse::success(zones)))
}

async fn update_location(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<LocationUpdateRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    request.validate()?;
    let message = state
        .coordinator
        .update_location(user.identity(), request.equipment_id.trim(), request.new_location.trim())
        .await?;
    Ok(Json(ApiResponse::message(message)))
}
