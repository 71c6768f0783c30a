use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, LoaderTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::dormitory::DormitoryDefaults;
use crate::entities::{dormitories, prelude::*, students};

/// Result of a find-or-create lookup on `(building, room_number)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub dormitory: dormitories::Model,
    /// True when this call inserted the row.
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct DormitoryFields {
    pub building: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i32,
    pub status: String,
}

pub struct DormitoryRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DormitoryRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<dormitories::Model>, DbErr> {
        Dormitories::find_by_id(id).one(self.conn).await
    }

    pub async fn get_many(&self, ids: &[i32]) -> Result<Vec<dormitories::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Dormitories::find()
            .filter(dormitories::Column::Id.is_in(ids.iter().copied()))
            .all(self.conn)
            .await
    }

    pub async fn find_by_location(
        &self,
        building: &str,
        room_number: &str,
    ) -> Result<Option<dormitories::Model>, DbErr> {
        Dormitories::find()
            .filter(dormitories::Column::Building.eq(building))
            .filter(dormitories::Column::RoomNumber.eq(room_number))
            .one(self.conn)
            .await
    }

    /// Another dormitory (not `exclude_id`) already at this location.
    pub async fn find_conflicting(
        &self,
        building: &str,
        room_number: &str,
        exclude_id: i32,
    ) -> Result<Option<dormitories::Model>, DbErr> {
        Dormitories::find()
            .filter(dormitories::Column::Building.eq(building))
            .filter(dormitories::Column::RoomNumber.eq(room_number))
            .filter(dormitories::Column::Id.ne(exclude_id))
            .one(self.conn)
            .await
    }

    pub async fn list_with_occupants(
        &self,
    ) -> Result<Vec<(dormitories::Model, Vec<students::Model>)>, DbErr> {
        let dorms = Dormitories::find()
            .order_by_asc(dormitories::Column::Building)
            .order_by_asc(dormitories::Column::RoomNumber)
            .all(self.conn)
            .await?;
        let occupants = dorms.load_many(Students, self.conn).await?;

        Ok(dorms.into_iter().zip(occupants).collect())
    }

    pub async fn occupant_count(&self, id: i32) -> Result<u64, DbErr> {
        Students::find()
            .filter(students::Column::DormitoryId.eq(id))
            .count(self.conn)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        Dormitories::find().count(self.conn).await
    }

    /// Inserts a new row. A location clash surfaces as a unique violation.
    pub async fn insert(&self, fields: DormitoryFields) -> Result<dormitories::Model, DbErr> {
        dormitories::ActiveModel {
            building: Set(fields.building),
            room_number: Set(fields.room_number),
            room_type: Set(fields.room_type),
            capacity: Set(fields.capacity),
            status: Set(fields.status),
            ..Default::default()
        }
        .insert(self.conn)
        .await
    }

    pub async fn update(
        &self,
        current: dormitories::Model,
        fields: DormitoryFields,
    ) -> Result<dormitories::Model, DbErr> {
        let mut active: dormitories::ActiveModel = current.into();
        active.building = Set(fields.building);
        active.room_number = Set(fields.room_number);
        active.room_type = Set(fields.room_type);
        active.capacity = Set(fields.capacity);
        active.status = Set(fields.status);
        active.update(self.conn).await
    }

    /// Touches the row so the surrounding transaction holds the write lock
    /// before it validates anything. Returns false when the row is missing.
    pub async fn lock(&self, id: i32) -> Result<bool, DbErr> {
        let result = Dormitories::update_many()
            .col_expr(
                dormitories::Column::Id,
                Expr::col(dormitories::Column::Id).into(),
            )
            .filter(dormitories::Column::Id.eq(id))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let result = Dormitories::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Finds the dormitory at `(building, room_number)`, creating it with
    /// `defaults` when absent. Both parts must already be trimmed.
    ///
    /// The insert runs before any read so that inside a transaction the
    /// write lock is taken first; a concurrent resolver of the same pair
    /// waits, then hits the location index and inserts nothing.
    pub async fn resolve(
        &self,
        building: &str,
        room_number: &str,
        defaults: &DormitoryDefaults,
    ) -> Result<Resolution, DbErr> {
        let inserted = Dormitories::insert(dormitories::ActiveModel {
            building: Set(building.to_string()),
            room_number: Set(room_number.to_string()),
            room_type: Set(defaults.room_type.clone()),
            capacity: Set(defaults.capacity),
            status: Set(defaults.status.clone()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([
                dormitories::Column::Building,
                dormitories::Column::RoomNumber,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(self.conn)
        .await?;

        let dormitory = self
            .find_by_location(building, room_number)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("dormitory {building}-{room_number}"))
            })?;

        Ok(Resolution {
            dormitory,
            created: inserted > 0,
        })
    }
}
