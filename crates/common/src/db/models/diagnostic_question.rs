//! Diagnostic question entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "diagnostic_questions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub study_source_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub question: String,

    /// Zero-based position within the source, dense at creation
    pub order_index: i32,

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

    #[sea_orm(has_many = "super::diagnostic_answer::Entity")]
    Answers,
}

impl Related<super::study_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudySource.def()
    }
}

impl Related<super::diagnostic_answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
