//! Read models: dashboard, source detail and plan view

use crate::StudyService;
use chrono::{DateTime, FixedOffset, NaiveDate};
use eduflow_common::db::models::{DiagnosticAnswer, DiagnosticQuestion, Review, StudySource};
use eduflow_common::errors::{AppError, Result};
use serde::Serialize;
use uuid::Uuid;

/// One dashboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceProgress {
    pub id: Uuid,
    pub title: String,
    pub deadline_date: Option<NaiveDate>,
    pub created_at: DateTime<FixedOffset>,
    pub question_count: usize,
    pub answered_count: usize,
    pub has_plan: bool,
    pub reviews_total: usize,
    pub reviews_completed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithAnswer {
    #[serde(flatten)]
    pub question: DiagnosticQuestion,
    pub answer: Option<DiagnosticAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDetail {
    pub source: StudySource,
    pub questions: Vec<QuestionWithAnswer>,
    pub has_plan: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub study_source_id: Uuid,
    pub title: String,
    pub plan: serde_json::Value,
    pub created_at: DateTime<FixedOffset>,
    pub reviews: Vec<Review>,
}

impl StudyService {
    /// Every source of the caller with its progress, newest first
    pub async fn dashboard(&self, user_id: Uuid) -> Result<Vec<SourceProgress>> {
        let sources = self.store.list_sources_for_user(user_id).await?;

        let mut rows = Vec::with_capacity(sources.len());
        for source in sources {
            let pairs = self.questions_with_answers(source.id).await?;
            let reviews = self.store.list_reviews_for_source(source.id).await?;
            let has_plan = self.store.find_plan(source.id).await?.is_some();

            rows.push(SourceProgress {
                id: source.id,
                title: source.title,
                deadline_date: source.deadline_date,
                created_at: source.created_at,
                question_count: pairs.len(),
                answered_count: pairs.iter().filter(|(_, a)| a.is_some()).count(),
                has_plan,
                reviews_total: reviews.len(),
                reviews_completed: reviews.iter().filter(|r| r.completed).count(),
            });
        }

        Ok(rows)
    }

    /// A source with its ordered questions and their first answers
    pub async fn source_detail(&self, user_id: Uuid, source_id: Uuid) -> Result<SourceDetail> {
        let source = self.owned_source(user_id, source_id).await?;
        let questions = self
            .questions_with_answers(source.id)
            .await?
            .into_iter()
            .map(|(question, answer)| QuestionWithAnswer { question, answer })
            .collect();
        let has_plan = self.store.find_plan(source.id).await?.is_some();

        Ok(SourceDetail {
            source,
            questions,
            has_plan,
        })
    }

    /// The stored plan of an owned source
    pub async fn plan_view(&self, user_id: Uuid, source_id: Uuid) -> Result<PlanView> {
        let source = self.owned_source(user_id, source_id).await?;
        let plan = self
            .store
            .find_plan(source.id)
            .await?
            .ok_or_else(|| AppError::PlanNotFound {
                source_id: source.id.to_string(),
            })?;
        let reviews = self.store.list_reviews_for_source(source.id).await?;

        Ok(PlanView {
            study_source_id: source.id,
            title: source.title,
            plan: plan.plan_json,
            created_at: plan.created_at,
            reviews,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, plan_json, questions_json};
    use crate::AnswerSubmission;

    #[tokio::test]
    async fn test_dashboard_counts() {
        let h = harness();
        let user = Uuid::new_v4();
        let source = h.source(user, "Cell Biology", "Body").await;
        h.source(user, "Untouched", "Body").await;

        h.completer.push_text(questions_json(3)).await;
        let questions = h.service.generate_questions(user, source.id).await.unwrap().questions;
        h.completer.push_text("Fine.").await;
        h.service
            .submit_answer(
                user,
                source.id,
                AnswerSubmission {
                    question_id: questions[1].id,
                    answer: "x".to_string(),
                },
            )
            .await
            .unwrap();
        h.completer.push_text(plan_json()).await;
        let plan = h.service.generate_plan(user, source.id).await.unwrap();
        h.service
            .complete_review(user, plan.reviews[0].id, chrono::Utc::now())
            .await
            .unwrap();

        let rows = h.service.dashboard(user).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Untouched");
        assert_eq!(rows[0].question_count, 0);
        assert!(!rows[0].has_plan);

        let bio = &rows[1];
        assert_eq!(bio.question_count, 3);
        assert_eq!(bio.answered_count, 1);
        assert!(bio.has_plan);
        assert_eq!((bio.reviews_total, bio.reviews_completed), (3, 1));
    }

    #[tokio::test]
    async fn test_detail_and_plan_view_ownership() {
        let h = harness();
        let user = Uuid::new_v4();
        let source = h.source(user, "Bio", "Body").await;

        let detail = h.service.source_detail(user, source.id).await.unwrap();
        assert!(detail.questions.is_empty());
        assert!(!detail.has_plan);

        let err = h.service.plan_view(user, source.id).await.unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound { .. }));

        let err = h.service.source_detail(Uuid::new_v4(), source.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_plan_view_returns_stored_json() {
        let h = harness();
        let user = Uuid::new_v4();
        let source = h.source(user, "Bio", "Body").await;
        h.completer.push_text(plan_json()).await;
        h.service.generate_plan(user, source.id).await.unwrap();

        let view = h.service.plan_view(user, source.id).await.unwrap();
        let expected: serde_json::Value = serde_json::from_str(&plan_json()).unwrap();
        assert_eq!(view.plan, expected);
        assert_eq!(view.reviews.len(), 3);
    }
}
