//! Datastore abstraction
//!
//! The study pipeline only talks to this trait. `Repository` backs it with
//! Postgres through SeaORM; `MemoryStore` backs it in memory for tests and
//! local runs.

use crate::db::models::*;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input for creating a study source
#[derive(Debug, Clone)]
pub struct NewStudySource {
    pub user_id: Uuid,
    pub title: String,
    pub raw_text: String,
    pub deadline_date: Option<NaiveDate>,
}

/// A review due for a reminder, joined to its source and owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct DueReminder {
    pub review_id: Uuid,
    pub study_source_id: Uuid,
    pub study_title: String,
    pub user_id: Uuid,
    pub user_email: Option<String>,
    pub scheduled_at: DateTimeWithTimeZone,
    /// 1-based position of the review within its source's schedule
    pub review_number: i64,
}

/// Durable state of the study pipeline
#[async_trait]
pub trait StudyStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    // Study sources

    async fn insert_source(&self, source: NewStudySource) -> Result<StudySource>;

    async fn find_source(&self, id: Uuid) -> Result<Option<StudySource>>;

    /// Sources owned by a user, newest first
    async fn list_sources_for_user(&self, user_id: Uuid) -> Result<Vec<StudySource>>;

    // Diagnostic questions

    async fn has_questions(&self, source_id: Uuid) -> Result<bool>;

    /// Insert all questions in one batch; order index = position in `questions`
    async fn insert_questions(
        &self,
        source_id: Uuid,
        questions: Vec<String>,
    ) -> Result<Vec<DiagnosticQuestion>>;

    /// Questions of a source ordered by order index
    async fn list_questions(&self, source_id: Uuid) -> Result<Vec<DiagnosticQuestion>>;

    async fn find_question(&self, id: Uuid) -> Result<Option<DiagnosticQuestion>>;

    // Diagnostic answers

    async fn insert_answer(
        &self,
        question_id: Uuid,
        user_answer: String,
        ai_feedback: String,
    ) -> Result<DiagnosticAnswer>;

    /// Answers for a set of questions, oldest first
    async fn list_answers(&self, question_ids: &[Uuid]) -> Result<Vec<DiagnosticAnswer>>;

    // Study plans

    async fn find_plan(&self, source_id: Uuid) -> Result<Option<StudyPlan>>;

    async fn insert_plan(&self, source_id: Uuid, plan_json: serde_json::Value) -> Result<StudyPlan>;

    // Reviews

    /// Insert one pending review per timestamp in one batch
    async fn insert_reviews(
        &self,
        source_id: Uuid,
        scheduled: Vec<DateTime<Utc>>,
    ) -> Result<Vec<Review>>;

    /// Reviews of a source ordered by scheduled time
    async fn list_reviews_for_source(&self, source_id: Uuid) -> Result<Vec<Review>>;

    /// Reviews across every source of a user ordered by scheduled time
    async fn list_reviews_for_user(&self, user_id: Uuid) -> Result<Vec<Review>>;

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>>;

    /// Set completed and completed_at, overwriting any prior value
    async fn complete_review(&self, id: Uuid, at: DateTime<Utc>) -> Result<Review>;

    /// Pending reviews without a reminder whose scheduled time is in `[start, end)`
    async fn due_reminders(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DueReminder>>;

    async fn mark_reminder_sent(&self, review_id: Uuid) -> Result<()>;

    // Users

    /// Record an authenticated user, keeping the stored email when `email` is `None`
    async fn upsert_user(&self, user_id: Uuid, email: Option<String>) -> Result<()>;

    async fn find_user_email(&self, user_id: Uuid) -> Result<Option<String>>;
}
