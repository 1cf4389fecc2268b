use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_RESOLVED: &str = "resolved";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const KIND_SOS: &str = "sos";
pub const KIND_SILENT: &str = "silent";
pub const KIND_CHECK_IN: &str = "check_in";
pub const KIND_ESCORT: &str = "escort";

pub fn is_valid_kind(kind: &str) -> bool {
    matches!(kind, KIND_SOS | KIND_SILENT | KIND_CHECK_IN | KIND_ESCORT)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "incidents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reporter_id: i32,
    pub kind: String,
    pub emergency_type: Option<String>,
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub voice_note_url: Option<String>,
    pub is_silent: bool,
    pub auto_contact: bool,
    pub created_at: DateTime,
    pub resolved_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Reporter,
    #[sea_orm(has_many = "super::incident_helper::Entity")]
    IncidentHelper,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reporter.def()
    }
}

impl Related<super::incident_helper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncidentHelper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
