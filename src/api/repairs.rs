use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
};
use std::sync::Arc;

use super::validation::{filter_label, parse_status_filter, validate_id};
use super::{ApiError, ApiResponse, AppState, MessageResponse, StatusQuery, TicketListDto};
use crate::db::{TicketFilter, TicketScope};
use crate::entities::repairs::RepairStatus;
use crate::services::{ImageUpload, Principal, RepairError, SubmitTicket, Submitted, TicketView};

impl From<RepairError> for ApiError {
    fn from(err: RepairError) -> Self {
        match err {
            RepairError::NotFound(_) => Self::NotFound(err.to_string()),
            RepairError::InvalidTransition(_) => Self::conflict(err.to_string()),
            RepairError::Validation(msg) => Self::validation(msg),
            RepairError::Database(msg) => Self::DatabaseError(msg),
            RepairError::Internal(msg) => Self::internal(msg),
        }
    }
}

async fn list_tickets(
    state: &AppState,
    query: &StatusQuery,
    default: TicketFilter,
    scope: TicketScope,
    with_counts: bool,
) -> Result<TicketListDto, ApiError> {
    let filter = parse_status_filter(query.status.as_deref(), default)?;
    let tickets = state.repair_service().list(filter, scope).await?;

    let counts = if with_counts {
        Some(state.repair_service().counts().await?)
    } else {
        None
    };

    Ok(TicketListDto {
        status: filter_label(filter),
        tickets,
        counts,
    })
}

/// GET /admin/repairs
pub async fn admin_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ApiResponse<TicketListDto>>, ApiError> {
    let list = list_tickets(&state, &query, TicketFilter::All, TicketScope::All, true).await?;
    Ok(Json(ApiResponse::success(list)))
}

/// GET /staff/repairs
pub async fn staff_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ApiResponse<TicketListDto>>, ApiError> {
    let list = list_tickets(
        &state,
        &query,
        TicketFilter::Status(RepairStatus::Pending),
        TicketScope::All,
        false,
    )
    .await?;
    Ok(Json(ApiResponse::success(list)))
}

/// GET /student/repairs
pub async fn student_list(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ApiResponse<TicketListDto>>, ApiError> {
    let list = list_tickets(
        &state,
        &query,
        TicketFilter::All,
        TicketScope::Submitter(principal.account_id),
        false,
    )
    .await?;
    Ok(Json(ApiResponse::success(list)))
}

/// GET /admin/repair/{id}, GET /staff/repair/{id}
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TicketView>>, ApiError> {
    let id = validate_id(id, "ticket")?;
    let ticket = state.repair_service().get(id).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

/// POST /student/repair (multipart/form-data)
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Submitted>>, ApiError> {
    let mut ticket = SubmitTicket::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(e.to_string()))?;

            // Browsers send an empty part when no file was chosen
            if !filename.is_empty() || !bytes.is_empty() {
                image = Some(ImageUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::validation(e.to_string()))?;

        match name.as_str() {
            "building" => ticket.building = value,
            "room_number" => ticket.room_number = value,
            "applicant_name" => ticket.applicant_name = value,
            "contact_phone" => ticket.contact_phone = Some(value),
            "bed_number" => ticket.bed_number = Some(value),
            "description" => ticket.description = value,
            _ => {}
        }
    }

    let submitted = state
        .repair_service()
        .submit(principal.account_id, ticket, image)
        .await?;

    Ok(Json(ApiResponse::success(submitted)))
}

/// DELETE /student/repair/{id}
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "ticket")?;
    state
        .repair_service()
        .cancel(principal.account_id, id)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Ticket {id} cancelled"
    )))))
}

/// POST /staff/repair/{id}/accept
pub async fn accept(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TicketView>>, ApiError> {
    let id = validate_id(id, "ticket")?;
    let ticket = state
        .repair_service()
        .accept(principal.account_id, id)
        .await?;
    Ok(Json(ApiResponse::success(ticket)))
}

/// POST /staff/repair/{id}/complete
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TicketView>>, ApiError> {
    let id = validate_id(id, "ticket")?;
    let ticket = state
        .repair_service()
        .complete(principal.account_id, id)
        .await?;
    Ok(Json(ApiResponse::success(ticket)))
}
