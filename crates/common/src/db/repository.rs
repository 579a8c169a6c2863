//! Repository pattern for database operations
//!
//! Postgres-backed implementation of [`StudyStore`] on SeaORM.

use crate::db::models::*;
use crate::db::store::{DueReminder, NewStudySource, StudyStore};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, Set, Statement,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }
}

#[async_trait]
impl StudyStore for Repository {
    // ========================================================================
    // Health Check
    // ========================================================================

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Study Source Operations
    // ========================================================================

    async fn insert_source(&self, source: NewStudySource) -> Result<StudySource> {
        let now = Utc::now();

        let model = StudySourceActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(source.user_id),
            title: Set(source.title),
            raw_text: Set(source.raw_text),
            deadline_date: Set(source.deadline_date),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.conn()).await.map_err(Into::into)
    }

    async fn find_source(&self, id: Uuid) -> Result<Option<StudySource>> {
        StudySourceEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_sources_for_user(&self, user_id: Uuid) -> Result<Vec<StudySource>> {
        StudySourceEntity::find()
            .filter(StudySourceColumn::UserId.eq(user_id))
            .order_by_desc(StudySourceColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Diagnostic Question Operations
    // ========================================================================

    async fn has_questions(&self, source_id: Uuid) -> Result<bool> {
        let count = QuestionEntity::find()
            .filter(QuestionColumn::StudySourceId.eq(source_id))
            .count(self.conn())
            .await?;

        Ok(count > 0)
    }

    async fn insert_questions(
        &self,
        source_id: Uuid,
        questions: Vec<String>,
    ) -> Result<Vec<DiagnosticQuestion>> {
        let now = Utc::now();

        let rows: Vec<DiagnosticQuestion> = questions
            .into_iter()
            .enumerate()
            .map(|(index, question)| DiagnosticQuestion {
                id: Uuid::new_v4(),
                study_source_id: source_id,
                question,
                order_index: index as i32,
                created_at: now.into(),
            })
            .collect();

        if rows.is_empty() {
            return Ok(rows);
        }

        let models: Vec<QuestionActiveModel> = rows
            .iter()
            .map(|q| QuestionActiveModel {
                id: Set(q.id),
                study_source_id: Set(q.study_source_id),
                question: Set(q.question.clone()),
                order_index: Set(q.order_index),
                created_at: Set(q.created_at),
            })
            .collect();

        QuestionEntity::insert_many(models).exec(self.conn()).await?;

        Ok(rows)
    }

    async fn list_questions(&self, source_id: Uuid) -> Result<Vec<DiagnosticQuestion>> {
        QuestionEntity::find()
            .filter(QuestionColumn::StudySourceId.eq(source_id))
            .order_by_asc(QuestionColumn::OrderIndex)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<DiagnosticQuestion>> {
        QuestionEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Diagnostic Answer Operations
    // ========================================================================

    async fn insert_answer(
        &self,
        question_id: Uuid,
        user_answer: String,
        ai_feedback: String,
    ) -> Result<DiagnosticAnswer> {
        let model = AnswerActiveModel {
            id: Set(Uuid::new_v4()),
            question_id: Set(question_id),
            user_answer: Set(user_answer),
            ai_feedback: Set(ai_feedback),
            created_at: Set(Utc::now().into()),
        };

        model.insert(self.conn()).await.map_err(Into::into)
    }

    async fn list_answers(&self, question_ids: &[Uuid]) -> Result<Vec<DiagnosticAnswer>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        AnswerEntity::find()
            .filter(AnswerColumn::QuestionId.is_in(question_ids.iter().copied()))
            .order_by_asc(AnswerColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Study Plan Operations
    // ========================================================================

    async fn find_plan(&self, source_id: Uuid) -> Result<Option<StudyPlan>> {
        StudyPlanEntity::find()
            .filter(StudyPlanColumn::StudySourceId.eq(source_id))
            .order_by_asc(StudyPlanColumn::CreatedAt)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_plan(&self, source_id: Uuid, plan_json: serde_json::Value) -> Result<StudyPlan> {
        let model = StudyPlanActiveModel {
            id: Set(Uuid::new_v4()),
            study_source_id: Set(source_id),
            plan_json: Set(plan_json),
            created_at: Set(Utc::now().into()),
        };

        model.insert(self.conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Review Operations
    // ========================================================================

    async fn insert_reviews(
        &self,
        source_id: Uuid,
        scheduled: Vec<DateTime<Utc>>,
    ) -> Result<Vec<Review>> {
        let now = Utc::now();

        let rows: Vec<Review> = scheduled
            .into_iter()
            .map(|at| Review {
                id: Uuid::new_v4(),
                study_source_id: source_id,
                scheduled_at: at.into(),
                completed: false,
                completed_at: None,
                reminder_sent: false,
                created_at: now.into(),
            })
            .collect();

        if rows.is_empty() {
            return Ok(rows);
        }

        let models: Vec<ReviewActiveModel> = rows
            .iter()
            .map(|r| ReviewActiveModel {
                id: Set(r.id),
                study_source_id: Set(r.study_source_id),
                scheduled_at: Set(r.scheduled_at),
                completed: Set(r.completed),
                completed_at: Set(r.completed_at),
                reminder_sent: Set(r.reminder_sent),
                created_at: Set(r.created_at),
            })
            .collect();

        ReviewEntity::insert_many(models).exec(self.conn()).await?;

        Ok(rows)
    }

    async fn list_reviews_for_source(&self, source_id: Uuid) -> Result<Vec<Review>> {
        ReviewEntity::find()
            .filter(ReviewColumn::StudySourceId.eq(source_id))
            .order_by_asc(ReviewColumn::ScheduledAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_reviews_for_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
        let source_ids: Vec<Uuid> = self
            .list_sources_for_user(user_id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        if source_ids.is_empty() {
            return Ok(Vec::new());
        }

        ReviewEntity::find()
            .filter(ReviewColumn::StudySourceId.is_in(source_ids))
            .order_by_asc(ReviewColumn::ScheduledAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        ReviewEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn complete_review(&self, id: Uuid, at: DateTime<Utc>) -> Result<Review> {
        let mut review: ReviewActiveModel = ReviewEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::ReviewNotFound { id: id.to_string() })?
            .into();

        review.completed = Set(true);
        review.completed_at = Set(Some(at.into()));

        review.update(self.conn()).await.map_err(Into::into)
    }

    async fn due_reminders(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DueReminder>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                r.id AS review_id,
                r.study_source_id,
                s.title AS study_title,
                s.user_id,
                u.email AS user_email,
                r.scheduled_at,
                (
                    SELECT COUNT(*)
                    FROM reviews r2
                    WHERE r2.study_source_id = r.study_source_id
                      AND r2.scheduled_at <= r.scheduled_at
                ) AS review_number
            FROM reviews r
            JOIN study_sources s ON s.id = r.study_source_id
            LEFT JOIN users u ON u.id = s.user_id
            WHERE r.scheduled_at >= $1
              AND r.scheduled_at < $2
              AND r.completed = FALSE
              AND r.reminder_sent = FALSE
            ORDER BY r.scheduled_at
            "#,
            vec![start.into(), end.into()],
        );

        DueReminder::find_by_statement(stmt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn mark_reminder_sent(&self, review_id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE reviews SET reminder_sent = TRUE WHERE id = $1",
            vec![review_id.into()],
        );

        let result = self.conn().execute(stmt).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::ReviewNotFound {
                id: review_id.to_string(),
            });
        }

        Ok(())
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    async fn upsert_user(&self, user_id: Uuid, email: Option<String>) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO users (id, email) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET email = COALESCE(EXCLUDED.email, users.email)
            "#,
            vec![user_id.into(), email.into()],
        );

        self.conn().execute(stmt).await?;
        Ok(())
    }

    async fn find_user_email(&self, user_id: Uuid) -> Result<Option<String>> {
        let user = UserEntity::find_by_id(user_id).one(self.conn()).await?;
        Ok(user.and_then(|u| u.email))
    }
}
