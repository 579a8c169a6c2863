//! Review entity for spaced-repetition checkpoints

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub study_source_id: Uuid,

    pub scheduled_at: DateTimeWithTimeZone,

    pub completed: bool,

    /// Set iff `completed`
    pub completed_at: Option<DateTimeWithTimeZone>,

    pub reminder_sent: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Pending and already due at `now`
    pub fn is_due(&self, now: DateTimeWithTimeZone) -> bool {
        !self.completed && self.scheduled_at <= now
    }
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
