//! Domain service for dormitories and the students living in them.
//!
//! Every mutation runs in one transaction whose first statement is a write,
//! so validation reads see the state the write will commit against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Resolution;
use crate::db::repositories::repair::StatusCounts;
use crate::domain::dormitory::CapacityViolation;
use crate::entities::dormitories;

#[derive(Debug, Error)]
pub enum OccupancyError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("A dormitory already exists at this building and room")]
    DuplicateDormitory,

    #[error("Capacity exceeds the {ceiling}-person limit for this room type")]
    CapacityExceeded { ceiling: i32 },

    #[error("Capacity must be at least 1")]
    InvalidCapacity,

    #[error("Dormitory still has occupants")]
    RoomOccupied,

    #[error("Building and room cannot change while the dormitory is occupied")]
    RoomOccupiedImmutable,

    #[error("Student number already in use")]
    DuplicateStudentNumber,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for OccupancyError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OccupancyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CapacityViolation> for OccupancyError {
    fn from(violation: CapacityViolation) -> Self {
        match violation {
            CapacityViolation::AboveCeiling { ceiling } => Self::CapacityExceeded { ceiling },
            CapacityViolation::BelowMinimum => Self::InvalidCapacity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DormitoryInput {
    pub building: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DormitoryView {
    pub id: i32,
    pub building: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i32,
    pub status: String,
    pub occupant_count: usize,
    pub occupants: Vec<String>,
}

/// Where a student asked to live. Building and room are both required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignRequest {
    pub building: String,
    pub room_number: String,
    #[serde(default)]
    pub bed_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub student_id: i32,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Serialize)]
pub struct DormitoryRef {
    pub id: i32,
    pub building: String,
    pub room_number: String,
    pub room_type: String,
    pub status: String,
}

impl From<dormitories::Model> for DormitoryRef {
    fn from(model: dormitories::Model) -> Self {
        Self {
            id: model.id,
            building: model.building,
            room_number: model.room_number,
            room_type: model.room_type,
            status: model.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    pub id: i32,
    pub account_id: i32,
    pub username: String,
    pub name: String,
    pub student_number: String,
    pub major: String,
    pub gender: String,
    pub bed_number: Option<String>,
    pub phone: Option<String>,
    pub dormitory: Option<DormitoryRef>,
}

/// Absent fields keep their value. Empty bed or phone clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub bed_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdated {
    pub profile: StudentView,
    pub dormitory_created: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudentRequest {
    pub name: String,
    pub major: String,
    pub gender: String,
    #[serde(default)]
    pub dormitory_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedStudent {
    pub student: StudentView,
    pub default_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditStudentRequest {
    pub name: String,
    pub student_number: String,
    pub major: String,
    pub gender: String,
    #[serde(default)]
    pub dormitory_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub dormitories: u64,
    pub students: u64,
    pub male_students: u64,
    pub female_students: u64,
    pub repairs: StatusCounts,
}

#[async_trait::async_trait]
pub trait OccupancyService: Send + Sync {
    async fn list_dormitories(&self) -> Result<Vec<DormitoryView>, OccupancyError>;

    /// # Errors
    ///
    /// [`OccupancyError::CapacityExceeded`], [`OccupancyError::InvalidCapacity`]
    /// or [`OccupancyError::DuplicateDormitory`].
    async fn add_dormitory(
        &self,
        input: DormitoryInput,
    ) -> Result<dormitories::Model, OccupancyError>;

    /// # Errors
    ///
    /// As [`OccupancyService::add_dormitory`], plus [`OccupancyError::NotFound`]
    /// and [`OccupancyError::RoomOccupiedImmutable`] when an occupied room
    /// would move.
    async fn edit_dormitory(
        &self,
        id: i32,
        input: DormitoryInput,
    ) -> Result<dormitories::Model, OccupancyError>;

    async fn delete_dormitory(&self, id: i32) -> Result<(), OccupancyError>;

    /// Find-or-create on a building/room pair with the placeholder defaults.
    async fn resolve(
        &self,
        building: &str,
        room_number: &str,
    ) -> Result<Resolution, OccupancyError>;

    async fn assign_student(
        &self,
        student_id: i32,
        request: AssignRequest,
    ) -> Result<AssignOutcome, OccupancyError>;

    async fn view_profile(&self, account_id: i32) -> Result<StudentView, OccupancyError>;

    async fn update_profile(
        &self,
        account_id: i32,
        update: ProfileUpdate,
    ) -> Result<ProfileUpdated, OccupancyError>;

    async fn list_students(&self) -> Result<Vec<StudentView>, OccupancyError>;

    async fn add_student(
        &self,
        request: NewStudentRequest,
    ) -> Result<CreatedStudent, OccupancyError>;

    async fn edit_student(
        &self,
        id: i32,
        request: EditStudentRequest,
    ) -> Result<StudentView, OccupancyError>;

    /// Removes the student together with its account.
    async fn delete_student(&self, id: i32) -> Result<(), OccupancyError>;

    async fn stats(&self) -> Result<DashboardStats, OccupancyError>;
}
