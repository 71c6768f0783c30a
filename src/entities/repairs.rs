use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    #[sea_orm(string_value = "pending")]
    Pending,

    #[sea_orm(string_value = "in_progress")]
    InProgress,

    #[sea_orm(string_value = "completed")]
    Completed,
}

impl RepairStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repairs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub dormitory_id: i32,

    /// Submitting account
    pub account_id: i32,

    pub applicant_name: String,
    pub contact_phone: Option<String>,
    pub bed_number: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub status: RepairStatus,

    pub created_at: DateTimeUtc,

    /// Set together with `handler_id` on every staff transition
    pub handled_at: Option<DateTimeUtc>,

    pub handler_id: Option<i32>,

    /// Stored file name under the uploads directory
    pub image_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dormitories::Entity",
        from = "Column::DormitoryId",
        to = "super::dormitories::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Dormitory,

    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Account,

    #[sea_orm(
        belongs_to = "super::staff::Entity",
        from = "Column::HandlerId",
        to = "super::staff::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Handler,
}

impl Related<super::dormitories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dormitory.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Handler.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
