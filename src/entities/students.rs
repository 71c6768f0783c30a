use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub account_id: i32,

    /// Externally visible student number, also accepted as a login identifier
    #[sea_orm(unique)]
    pub student_number: String,

    pub major: String,
    pub gender: String,
    pub dormitory_id: Option<i32>,
    pub bed_number: Option<String>,
    pub phone: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Account,

    // Restrict keeps the store itself from leaving a dangling dormitory reference.
    #[sea_orm(
        belongs_to = "super::dormitories::Entity",
        from = "Column::DormitoryId",
        to = "super::dormitories::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Dormitory,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::dormitories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dormitory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
