use serde::{Deserialize, Serialize};

use crate::db::repositories::repair::StatusCounts;
use crate::entities::dormitories;
use crate::services::{Principal, TicketView};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrincipalDto {
    pub account_id: i32,
    pub username: String,
    pub name: String,
    pub role: String,
}

impl From<Principal> for PrincipalDto {
    fn from(principal: Principal) -> Self {
        Self {
            account_id: principal.account_id,
            username: principal.username,
            name: principal.name,
            role: principal.role.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DormitoryDto {
    pub id: i32,
    pub building: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i32,
    pub status: String,
}

impl From<dormitories::Model> for DormitoryDto {
    fn from(model: dormitories::Model) -> Self {
        Self {
            id: model.id,
            building: model.building,
            room_number: model.room_number,
            room_type: model.room_type,
            capacity: model.capacity,
            status: model.status,
        }
    }
}

/// `?status=` filter on ticket lists: a status name or `all`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketListDto {
    pub status: String,
    pub tickets: Vec<TicketView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<StatusCounts>,
}
