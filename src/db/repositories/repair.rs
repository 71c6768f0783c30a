use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::repairs::{self, RepairStatus};
use crate::entities::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketFilter {
    #[default]
    All,
    Status(RepairStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    All,
    Submitter(i32),
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub dormitory_id: i32,
    pub account_id: i32,
    pub applicant_name: String,
    pub contact_phone: Option<String>,
    pub bed_number: Option<String>,
    pub description: String,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
}

impl StatusCounts {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending + self.in_progress + self.completed
    }
}

pub struct RepairRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> RepairRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<repairs::Model>, DbErr> {
        Repairs::find_by_id(id).one(self.conn).await
    }

    /// Ticket `id` only if `account_id` submitted it.
    pub async fn get_for_submitter(
        &self,
        id: i32,
        account_id: i32,
    ) -> Result<Option<repairs::Model>, DbErr> {
        Repairs::find_by_id(id)
            .filter(repairs::Column::AccountId.eq(account_id))
            .one(self.conn)
            .await
    }

    /// Newest first; ties on creation time fall back to id.
    pub async fn list(
        &self,
        filter: TicketFilter,
        scope: TicketScope,
    ) -> Result<Vec<repairs::Model>, DbErr> {
        let mut query = Repairs::find();

        if let TicketFilter::Status(status) = filter {
            query = query.filter(repairs::Column::Status.eq(status));
        }

        if let TicketScope::Submitter(account_id) = scope {
            query = query.filter(repairs::Column::AccountId.eq(account_id));
        }

        query
            .order_by_desc(repairs::Column::CreatedAt)
            .order_by_desc(repairs::Column::Id)
            .all(self.conn)
            .await
    }

    pub async fn count_by_status(&self) -> Result<StatusCounts, DbErr> {
        let count = |status: RepairStatus| {
            Repairs::find()
                .filter(repairs::Column::Status.eq(status))
                .count(self.conn)
        };

        Ok(StatusCounts {
            pending: count(RepairStatus::Pending).await?,
            in_progress: count(RepairStatus::InProgress).await?,
            completed: count(RepairStatus::Completed).await?,
        })
    }

    pub async fn insert(&self, ticket: NewTicket) -> Result<repairs::Model, DbErr> {
        repairs::ActiveModel {
            dormitory_id: Set(ticket.dormitory_id),
            account_id: Set(ticket.account_id),
            applicant_name: Set(ticket.applicant_name),
            contact_phone: Set(ticket.contact_phone),
            bed_number: Set(ticket.bed_number),
            description: Set(ticket.description),
            status: Set(RepairStatus::Pending),
            created_at: Set(Utc::now()),
            handled_at: Set(None),
            handler_id: Set(None),
            image_path: Set(ticket.image_path),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    /// Moves the ticket to `to` and stamps the handler, but only while it is
    /// still in `from`. Returns false when the status changed underneath.
    pub async fn advance(
        &self,
        id: i32,
        from: RepairStatus,
        to: RepairStatus,
        handler_id: i32,
        handled_at: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let result = Repairs::update_many()
            .col_expr(repairs::Column::Status, Expr::value(to))
            .col_expr(repairs::Column::HandlerId, Expr::value(handler_id))
            .col_expr(repairs::Column::HandledAt, Expr::value(handled_at))
            .filter(repairs::Column::Id.eq(id))
            .filter(repairs::Column::Status.eq(from))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Stored image names on tickets whose `column` equals `id`. Read before
    /// a delete that cascades to those tickets.
    pub async fn image_names(
        &self,
        column: repairs::Column,
        id: i32,
    ) -> Result<Vec<String>, DbErr> {
        let tickets = Repairs::find()
            .filter(column.eq(id))
            .filter(repairs::Column::ImagePath.is_not_null())
            .all(self.conn)
            .await?;

        Ok(tickets.into_iter().filter_map(|t| t.image_path).collect())
    }

    pub async fn clear_image(&self, id: i32) -> Result<bool, DbErr> {
        let result = Repairs::update_many()
            .col_expr(repairs::Column::ImagePath, Expr::value(Option::<String>::None))
            .filter(repairs::Column::Id.eq(id))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Deletes the ticket only while it is still in `status`.
    pub async fn delete_in_status(&self, id: i32, status: RepairStatus) -> Result<bool, DbErr> {
        let result = Repairs::delete_many()
            .filter(repairs::Column::Id.eq(id))
            .filter(repairs::Column::Status.eq(status))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
