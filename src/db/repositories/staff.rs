use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::{prelude::*, staff};

pub struct StaffRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> StaffRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_by_account(&self, account_id: i32) -> Result<Option<staff::Model>, DbErr> {
        Staff::find()
            .filter(staff::Column::AccountId.eq(account_id))
            .one(self.conn)
            .await
    }

    pub async fn get_many(&self, ids: &[i32]) -> Result<Vec<staff::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Staff::find()
            .filter(staff::Column::Id.is_in(ids.iter().copied()))
            .all(self.conn)
            .await
    }

    pub async fn insert(
        &self,
        account_id: i32,
        staff_number: String,
    ) -> Result<staff::Model, DbErr> {
        staff::ActiveModel {
            account_id: Set(account_id),
            staff_number: Set(staff_number),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }
}
