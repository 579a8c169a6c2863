//! Diagnostic answer entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "diagnostic_answers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub question_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub user_answer: String,

    #[sea_orm(column_type = "Text")]
    pub ai_feedback: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::diagnostic_question::Entity",
        from = "Column::QuestionId",
        to = "super::diagnostic_question::Column::Id",
        on_delete = "Cascade"
    )]
    Question,
}

impl Related<super::diagnostic_question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
