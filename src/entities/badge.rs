use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "badges")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub icon: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub tier: String,
    pub points_required: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_badge::Entity")]
    UserBadge,
}

impl Related<super::user_badge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserBadge.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
