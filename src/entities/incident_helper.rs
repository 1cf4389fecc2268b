use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_RESPONDING: &str = "responding";
pub const STATUS_ARRIVED: &str = "arrived";
pub const STATUS_COMPLETED: &str = "completed";

/// One row per (incident, helper) pair. The serial `id` doubles as the
/// persisted insertion order used to break first-responder ties.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "incident_helpers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub incident_id: Uuid,
    pub helper_id: i32,
    pub status: String,
    pub responded_at: DateTime,
    pub arrived_at: Option<DateTime>,
    pub rating: Option<i32>,
    pub actions_taken: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub thank_you_note: Option<String>,
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
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::HelperId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Helper,
}

impl Related<super::incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incident.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Helper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
