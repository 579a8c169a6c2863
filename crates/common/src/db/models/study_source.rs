//! Study source entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "study_sources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owner; every entity below the source is scoped through this
    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Extracted plain-text body, never empty
    #[sea_orm(column_type = "Text")]
    pub raw_text: String,

    pub deadline_date: Option<Date>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Check whether the given identity owns this source
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::diagnostic_question::Entity")]
    DiagnosticQuestions,

    #[sea_orm(has_many = "super::study_plan::Entity")]
    StudyPlans,

    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::diagnostic_question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiagnosticQuestions.def()
    }
}

impl Related<super::study_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudyPlans.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
