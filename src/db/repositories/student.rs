use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::{prelude::*, students};

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub account_id: i32,
    pub student_number: String,
    pub major: String,
    pub gender: String,
    pub dormitory_id: Option<i32>,
    pub bed_number: Option<String>,
    pub phone: Option<String>,
}

/// Dormitory reference plus the per-student placement details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub dormitory_id: Option<i32>,
    pub bed_number: Option<String>,
    pub phone: Option<String>,
}

pub struct StudentRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> StudentRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<students::Model>, DbErr> {
        Students::find_by_id(id).one(self.conn).await
    }

    pub async fn get_by_account(
        &self,
        account_id: i32,
    ) -> Result<Option<students::Model>, DbErr> {
        Students::find()
            .filter(students::Column::AccountId.eq(account_id))
            .one(self.conn)
            .await
    }

    pub async fn get_by_number(
        &self,
        student_number: &str,
    ) -> Result<Option<students::Model>, DbErr> {
        Students::find()
            .filter(students::Column::StudentNumber.eq(student_number))
            .one(self.conn)
            .await
    }

    /// Whether a student other than `exclude_id` holds `student_number`.
    pub async fn number_taken(
        &self,
        student_number: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool, DbErr> {
        let mut query =
            Students::find().filter(students::Column::StudentNumber.eq(student_number));

        if let Some(id) = exclude_id {
            query = query.filter(students::Column::Id.ne(id));
        }

        Ok(query.count(self.conn).await? > 0)
    }

    pub async fn list(&self) -> Result<Vec<students::Model>, DbErr> {
        Students::find()
            .order_by_asc(students::Column::StudentNumber)
            .all(self.conn)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        Students::find().count(self.conn).await
    }

    pub async fn count_by_gender(&self, gender: &str) -> Result<u64, DbErr> {
        Students::find()
            .filter(students::Column::Gender.eq(gender))
            .count(self.conn)
            .await
    }

    pub async fn insert(&self, student: NewStudent) -> Result<students::Model, DbErr> {
        students::ActiveModel {
            account_id: Set(student.account_id),
            student_number: Set(student.student_number),
            major: Set(student.major),
            gender: Set(student.gender),
            dormitory_id: Set(student.dormitory_id),
            bed_number: Set(student.bed_number),
            phone: Set(student.phone),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    pub async fn update_record(
        &self,
        current: students::Model,
        student_number: String,
        major: String,
        gender: String,
        dormitory_id: Option<i32>,
    ) -> Result<students::Model, DbErr> {
        let mut active: students::ActiveModel = current.into();
        active.student_number = Set(student_number);
        active.major = Set(major);
        active.gender = Set(gender);
        active.dormitory_id = Set(dormitory_id);
        active.update(self.conn).await
    }

    pub async fn update_details(
        &self,
        current: students::Model,
        major: String,
        gender: String,
    ) -> Result<students::Model, DbErr> {
        let mut active: students::ActiveModel = current.into();
        active.major = Set(major);
        active.gender = Set(gender);
        active.update(self.conn).await
    }

    /// Writes the placement columns without reading the row first.
    /// Returns false when no student has this id.
    pub async fn set_assignment(&self, id: i32, assignment: Assignment) -> Result<bool, DbErr> {
        let result = Students::update_many()
            .col_expr(
                students::Column::DormitoryId,
                Expr::value(assignment.dormitory_id),
            )
            .col_expr(
                students::Column::BedNumber,
                Expr::value(assignment.bed_number),
            )
            .col_expr(students::Column::Phone, Expr::value(assignment.phone))
            .filter(students::Column::Id.eq(id))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Touches the row so the surrounding transaction holds the write lock
    /// before it validates anything. Returns false when the row is missing.
    pub async fn lock(&self, id: i32) -> Result<bool, DbErr> {
        let result = Students::update_many()
            .col_expr(students::Column::Id, Expr::col(students::Column::Id).into())
            .filter(students::Column::Id.eq(id))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let result = Students::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
