use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::services::occupancy_service::ProfileUpdated;
use crate::services::{Principal, ProfileUpdate, StudentView};

/// GET /student/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<StudentView>>, ApiError> {
    let profile = state
        .occupancy_service()
        .view_profile(principal.account_id)
        .await?;

    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /student/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<ProfileUpdated>>, ApiError> {
    let updated = state
        .occupancy_service()
        .update_profile(principal.account_id, payload)
        .await?;

    Ok(Json(ApiResponse::success(updated)))
}
