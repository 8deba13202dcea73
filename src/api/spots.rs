//! Spot API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{SpotState, SpotStatus};
use crate::AppState;

/// Request body for creating a spot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpotRequest {
    pub spot_name: String,
}

/// Request body for changing a spot's status.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// GET /api/spots - Current list, loading flag and error.
pub async fn get_spots(State(state): State<AppState>) -> ApiResult<SpotState> {
    success(state.view_model.snapshot())
}

/// POST /api/spots/refresh - Reload the list from the store.
pub async fn refresh_spots(State(state): State<AppState>) -> ApiResult<SpotState> {
    state.view_model.fetch_spots().await?;
    success(state.view_model.snapshot())
}

/// POST /api/spots - Create a spot.
pub async fn create_spot(
    State(state): State<AppState>,
    Json(request): Json<CreateSpotRequest>,
) -> ApiResult<SpotState> {
    let spot_name = request.spot_name.trim();
    if spot_name.is_empty() {
        return Err(AppError::Validation("Spot name is required".to_string()));
    }

    state.view_model.create_spot(spot_name).await?;
    success(state.view_model.snapshot())
}

/// PUT /api/spots/{id}/status - Set a spot's occupancy.
pub async fn update_spot_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<SpotState> {
    let Some(status) = SpotStatus::from_str(&request.status) else {
        let allowed: Vec<&str> = SpotStatus::ALL.iter().map(|s| s.as_str()).collect();
        return Err(AppError::Validation(format!(
            "Status must be one of: {}",
            allowed.join(", ")
        )));
    };

    state.view_model.update_status(id, status.as_str()).await?;
    success(state.view_model.snapshot())
}

/// DELETE /api/error - Dismiss the current error message.
pub async fn clear_error(State(state): State<AppState>) -> ApiResult<SpotState> {
    state.view_model.clear_error();
    success(state.view_model.snapshot())
}
