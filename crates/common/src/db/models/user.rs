//! User entity
//!
//! Mirror of the identity provider's users; only the fields the pipeline reads.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Display name derived from the local part of the email address
    pub fn display_name(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::study_source::Entity")]
    StudySources,
}

impl Related<super::study_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudySources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
