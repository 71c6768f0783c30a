use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, DormitoryDto, MessageResponse};
use crate::services::{DashboardStats, DormitoryInput, DormitoryView, OccupancyError};

impl From<OccupancyError> for ApiError {
    fn from(err: OccupancyError) -> Self {
        match err {
            OccupancyError::NotFound(_) => Self::NotFound(err.to_string()),
            OccupancyError::DuplicateDormitory
            | OccupancyError::DuplicateStudentNumber
            | OccupancyError::CapacityExceeded { .. }
            | OccupancyError::RoomOccupied
            | OccupancyError::RoomOccupiedImmutable => Self::conflict(err.to_string()),
            OccupancyError::InvalidCapacity => Self::validation(err.to_string()),
            OccupancyError::Validation(msg) => Self::validation(msg),
            OccupancyError::Database(msg) => Self::DatabaseError(msg),
            OccupancyError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// GET /admin/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = state.occupancy_service().stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /admin/dormitories
pub async fn list_dormitories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<DormitoryView>>>, ApiError> {
    let dormitories = state.occupancy_service().list_dormitories().await?;
    Ok(Json(ApiResponse::success(dormitories)))
}

/// POST /admin/dormitory
pub async fn add_dormitory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DormitoryInput>,
) -> Result<Json<ApiResponse<DormitoryDto>>, ApiError> {
    let dormitory = state.occupancy_service().add_dormitory(payload).await?;
    Ok(Json(ApiResponse::success(dormitory.into())))
}

/// PUT /admin/dormitory/{id}
pub async fn edit_dormitory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<DormitoryInput>,
) -> Result<Json<ApiResponse<DormitoryDto>>, ApiError> {
    let id = validate_id(id, "dormitory")?;
    let dormitory = state.occupancy_service().edit_dormitory(id, payload).await?;
    Ok(Json(ApiResponse::success(dormitory.into())))
}

/// DELETE /admin/dormitory/{id}
pub async fn delete_dormitory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "dormitory")?;
    state.occupancy_service().delete_dormitory(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Dormitory {id} deleted"
    )))))
}
