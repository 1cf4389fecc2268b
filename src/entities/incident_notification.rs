use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const KIND_TRUSTED_CIRCLE: &str = "trusted_circle";
pub const KIND_NEARBY_HELPER: &str = "nearby_helper";
pub const KIND_EMERGENCY_SERVICES: &str = "emergency_services";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "incident_notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub incident_id: Uuid,
    pub user_id: i32,
    pub kind: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::incident::Entity",
        from = "Column::IncidentId",
        to = "super::incident::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Incident,
}

impl Related<super::incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incident.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
