//! Domain service for the repair ticket lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::repositories::repair::StatusCounts;
use crate::db::{TicketFilter, TicketScope};
use crate::domain::ticket::InvalidTransition;
use crate::entities::repairs::RepairStatus;
use crate::services::uploads::UploadError;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RepairError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RepairError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<UploadError> for RepairError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Rejected(reason) => Self::Validation(reason),
            UploadError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitTicket {
    pub building: String,
    pub room_number: String,
    pub applicant_name: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub bed_number: Option<String>,
    pub description: String,
}

/// Image part of a submission, as received.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub id: i32,
    pub dormitory_id: i32,
    /// `building-room`, empty when the dormitory row is gone
    pub dormitory: String,
    pub account_id: i32,
    pub submitter: Option<String>,
    pub applicant_name: String,
    pub contact_phone: Option<String>,
    pub bed_number: Option<String>,
    pub description: String,
    pub status: RepairStatus,
    pub created_at: DateTime<Utc>,
    pub handled_at: Option<DateTime<Utc>>,
    pub handler_id: Option<i32>,
    pub handler_number: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Submitted {
    pub ticket: TicketView,
    pub dormitory_created: bool,
}

#[async_trait::async_trait]
pub trait RepairService: Send + Sync {
    /// Resolves the dormitory, stages the image and creates a pending ticket.
    async fn submit(
        &self,
        account_id: i32,
        ticket: SubmitTicket,
        image: Option<ImageUpload>,
    ) -> Result<Submitted, RepairError>;

    /// Withdraws a pending ticket owned by `account_id`.
    ///
    /// # Errors
    ///
    /// [`RepairError::NotFound`] when the ticket is not the caller's,
    /// [`RepairError::InvalidTransition`] once it left `pending`.
    async fn cancel(&self, account_id: i32, ticket_id: i32) -> Result<(), RepairError>;

    async fn accept(
        &self,
        staff_account_id: i32,
        ticket_id: i32,
    ) -> Result<TicketView, RepairError>;

    async fn complete(
        &self,
        staff_account_id: i32,
        ticket_id: i32,
    ) -> Result<TicketView, RepairError>;

    async fn list(
        &self,
        filter: TicketFilter,
        scope: TicketScope,
    ) -> Result<Vec<TicketView>, RepairError>;

    async fn get(&self, ticket_id: i32) -> Result<TicketView, RepairError>;

    async fn counts(&self) -> Result<StatusCounts, RepairError>;
}
