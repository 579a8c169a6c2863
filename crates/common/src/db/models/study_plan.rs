//! Study plan entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "study_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub study_source_id: Uuid,

    /// Macro/meso/micro tree exactly as the model produced it
    #[sea_orm(column_type = "JsonBinary")]
    pub plan_json: serde_json::Value,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::study_source::Entity",
        from = "Column::StudySourceId",
        to = "super::study_source::Column::Id",
        on_delete = "Cascade"
    )]
    StudySource,
}

impl Related<super::study_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudySource.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
