use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::dto::trip_dto::{CheckInRequest, CheckoutRequest, SwapEquipmentRequest, TripResponse};
use crate::dto::ApiResponse;
use crate::middleware::SessionUser;
use crate::models::ActiveTrip;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/checkin", post(check_in))
        .route("/swap", post(swap))
        .route("/mine", get(my_active_trip))
}

async fn checkout(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<TripResponse>>> {
    request.validate()?;
    let (target, details) = request.into_parts()?;
    let receipt = state
        .coordinator
        .checkout(user.identity(), target, details)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        TripResponse { trip_id: receipt.trip_id },
        receipt.message,
    )))
}

async fn check_in(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<CheckInRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    request.validate()?;
    let message = state
        .coordinator
        .check_in(user.identity(), request.into())
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

async fn swap(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<SwapEquipmentRequest>,
) -> AppResult<Json<ApiResponse<TripResponse>>> {
    request.validate()?;
    let receipt = state.coordinator.swap(user.identity(), request.into()).await?;
    Ok(Json(ApiResponse::success_with_message(
        TripResponse { trip_id: receipt.trip_id },
        receipt.message,
    )))
}

/// The caller's open trip, `null` when there is none.
async fn my_active_trip(
    State(state): State<AppState>,
    user: SessionUser,
) -> AppResult<Json<ApiResponse<Option<ActiveTrip>>>> {
    let trip = state
        .projections
        .find_active_trip(&user.identity().username)
        .await?;
    Ok(Json(ApiResponse::success(trip)))
}
