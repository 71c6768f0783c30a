use sea_orm::entity::prelude::*;

/// A physical room. `(building, room_number)` is unique through
/// `idx_dormitories_location`, created by the initial migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dormitories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub building: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i32,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::students::Entity")]
    Students,

    #[sea_orm(has_many = "super::repairs::Entity")]
    Repairs,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::repairs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repairs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
