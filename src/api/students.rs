use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::occupancy_service::CreatedStudent;
use crate::services::{EditStudentRequest, NewStudentRequest, StudentView};

/// GET /admin/students
pub async fn list_students(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<StudentView>>>, ApiError> {
    let students = state.occupancy_service().list_students().await?;
    Ok(Json(ApiResponse::success(students)))
}

/// POST /admin/student
pub async fn add_student(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewStudentRequest>,
) -> Result<Json<ApiResponse<CreatedStudent>>, ApiError> {
    if let Some(id) = payload.dormitory_id {
        validate_id(id, "dormitory")?;
    }

    let created = state.occupancy_service().add_student(payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// PUT /admin/student/{id}
pub async fn edit_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<EditStudentRequest>,
) -> Result<Json<ApiResponse<StudentView>>, ApiError> {
    let id = validate_id(id, "student")?;
    let student = state.occupancy_service().edit_student(id, payload).await?;
    Ok(Json(ApiResponse::success(student)))
}

/// DELETE /admin/student/{id}
pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "student")?;
    state.occupancy_service().delete_student(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Student {id} deleted"
    )))))
}
