//! In-memory [`StudyStore`]
//!
//! Keeps every table in insertion order behind one lock. Used by the unit and
//! router tests, and by local runs without Postgres.

use crate::db::models::*;
use crate::db::store::{DueReminder, NewStudySource, StudyStore};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sources: Vec<StudySource>,
    questions: Vec<DiagnosticQuestion>,
    answers: Vec<DiagnosticAnswer>,
    plans: Vec<StudyPlan>,
    reviews: Vec<Review>,
}

/// In-memory datastore
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_review_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user row, as the identity provider would
    pub async fn add_user(&self, id: Uuid, email: Option<&str>) {
        let mut tables = self.tables.write().await;
        tables.users.retain(|u| u.id != id);
        tables.users.push(User {
            id,
            email: email.map(str::to_string),
            created_at: Utc::now().into(),
        });
    }

    /// Number of known users
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Make every subsequent `insert_reviews` fail
    pub fn fail_review_inserts(&self, fail: bool) {
        self.fail_review_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of stored study sources
    pub async fn source_count(&self) -> usize {
        self.tables.read().await.sources.len()
    }

    /// Number of stored plans for a source
    pub async fn plan_count(&self, source_id: Uuid) -> usize {
        self.tables
            .read()
            .await
            .plans
            .iter()
            .filter(|p| p.study_source_id == source_id)
            .count()
    }
}

#[async_trait]
impl StudyStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_source(&self, source: NewStudySource) -> Result<StudySource> {
        let now = Utc::now();
        let row = StudySource {
            id: Uuid::new_v4(),
            user_id: source.user_id,
            title: source.title,
            raw_text: source.raw_text,
            deadline_date: source.deadline_date,
            created_at: now.into(),
            updated_at: now.into(),
        };

        self.tables.write().await.sources.push(row.clone());
        Ok(row)
    }

    async fn find_source(&self, id: Uuid) -> Result<Option<StudySource>> {
        let tables = self.tables.read().await;
        Ok(tables.sources.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sources_for_user(&self, user_id: Uuid) -> Result<Vec<StudySource>> {
        let tables = self.tables.read().await;
        // Later inserts first; stable on equal timestamps
        let mut sources: Vec<StudySource> = tables
            .sources
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sources)
    }

    async fn has_questions(&self, source_id: Uuid) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().any(|q| q.study_source_id == source_id))
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

        // Order indexes restart at 0, so any existing row collides
        let mut tables = self.tables.write().await;
        if tables.questions.iter().any(|q| q.study_source_id == source_id) {
            return Err(AppError::Internal {
                message: format!("diagnostic questions for {} already exist", source_id),
            });
        }
        tables.questions.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn list_questions(&self, source_id: Uuid) -> Result<Vec<DiagnosticQuestion>> {
        let tables = self.tables.read().await;
        let mut questions: Vec<DiagnosticQuestion> = tables
            .questions
            .iter()
            .filter(|q| q.study_source_id == source_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<DiagnosticQuestion>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn insert_answer(
        &self,
        question_id: Uuid,
        user_answer: String,
        ai_feedback: String,
    ) -> Result<DiagnosticAnswer> {
        let row = DiagnosticAnswer {
            id: Uuid::new_v4(),
            question_id,
            user_answer,
            ai_feedback,
            created_at: Utc::now().into(),
        };

        self.tables.write().await.answers.push(row.clone());
        Ok(row)
    }

    async fn list_answers(&self, question_ids: &[Uuid]) -> Result<Vec<DiagnosticAnswer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .iter()
            .filter(|a| question_ids.contains(&a.question_id))
            .cloned()
            .collect())
    }

    async fn find_plan(&self, source_id: Uuid) -> Result<Option<StudyPlan>> {
        let tables = self.tables.read().await;
        Ok(tables
            .plans
            .iter()
            .find(|p| p.study_source_id == source_id)
            .cloned())
    }

    async fn insert_plan(&self, source_id: Uuid, plan_json: serde_json::Value) -> Result<StudyPlan> {
        let row = StudyPlan {
            id: Uuid::new_v4(),
            study_source_id: source_id,
            plan_json,
            created_at: Utc::now().into(),
        };

        let mut tables = self.tables.write().await;
        if tables.plans.iter().any(|p| p.study_source_id == source_id) {
            return Err(AppError::Internal {
                message: format!("study plan for {} already exists", source_id),
            });
        }
        tables.plans.push(row.clone());
        Ok(row)
    }

    async fn insert_reviews(
        &self,
        source_id: Uuid,
        scheduled: Vec<DateTime<Utc>>,
    ) -> Result<Vec<Review>> {
        if self.fail_review_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal {
                message: "review insert failed".to_string(),
            });
        }

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

        self.tables.write().await.reviews.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn list_reviews_for_source(&self, source_id: Uuid) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.study_source_id == source_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| r.scheduled_at);
        Ok(reviews)
    }

    async fn list_reviews_for_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        let owned: Vec<Uuid> = tables
            .sources
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id)
            .collect();

        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| owned.contains(&r.study_source_id))
            .cloned()
            .collect();
        reviews.sort_by_key(|r| r.scheduled_at);
        Ok(reviews)
    }

    async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn complete_review(&self, id: Uuid, at: DateTime<Utc>) -> Result<Review> {
        let mut tables = self.tables.write().await;
        let review = tables
            .reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::ReviewNotFound { id: id.to_string() })?;

        review.completed = true;
        review.completed_at = Some(at.into());
        Ok(review.clone())
    }

    async fn due_reminders(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DueReminder>> {
        let tables = self.tables.read().await;

        let mut due: Vec<DueReminder> = tables
            .reviews
            .iter()
            .filter(|r| !r.completed && !r.reminder_sent)
            .filter(|r| r.scheduled_at >= start && r.scheduled_at < end)
            .filter_map(|r| {
                let source = tables.sources.iter().find(|s| s.id == r.study_source_id)?;
                let user_email = tables
                    .users
                    .iter()
                    .find(|u| u.id == source.user_id)
                    .and_then(|u| u.email.clone());
                let review_number = tables
                    .reviews
                    .iter()
                    .filter(|o| o.study_source_id == r.study_source_id)
                    .filter(|o| o.scheduled_at <= r.scheduled_at)
                    .count() as i64;

                Some(DueReminder {
                    review_id: r.id,
                    study_source_id: source.id,
                    study_title: source.title.clone(),
                    user_id: source.user_id,
                    user_email,
                    scheduled_at: r.scheduled_at,
                    review_number,
                })
            })
            .collect();

        due.sort_by_key(|d| d.scheduled_at);
        Ok(due)
    }

    async fn mark_reminder_sent(&self, review_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        let review = tables
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .ok_or_else(|| AppError::ReviewNotFound {
                id: review_id.to_string(),
            })?;

        review.reminder_sent = true;
        Ok(())
    }

    async fn upsert_user(&self, user_id: Uuid, email: Option<String>) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                if email.is_some() {
                    user.email = email;
                }
            }
            None => tables.users.push(User {
                id: user_id,
                email,
                created_at: Utc::now().into(),
            }),
        }
        Ok(())
    }

    async fn find_user_email(&self, user_id: Uuid) -> Result<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.id == user_id)
            .and_then(|u| u.email.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_source(user_id: Uuid, title: &str) -> NewStudySource {
        NewStudySource {
            user_id,
            title: title.to_string(),
            raw_text: "Mitochondria produce ATP.".to_string(),
            deadline_date: None,
        }
    }

    #[tokio::test]
    async fn test_questions_keep_order_index() {
        let store = MemoryStore::new();
        let source = store.insert_source(new_source(Uuid::new_v4(), "Bio")).await.unwrap();

        let inserted = store
            .insert_questions(source.id, vec!["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 3);

        let listed = store.list_questions(source.id).await.unwrap();
        let order: Vec<i32> = listed.iter().map(|q| q.order_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(listed[1].question, "b");
        assert!(store.has_questions(source.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_due_reminders_window_and_numbering() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.add_user(user, Some("ada@example.com")).await;
        let source = store.insert_source(new_source(user, "Cell Biology")).await.unwrap();

        let now = Utc::now();
        store
            .insert_reviews(
                source.id,
                vec![now - Duration::days(5), now, now + Duration::days(5)],
            )
            .await
            .unwrap();

        let due = store
            .due_reminders(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].review_number, 2);
        assert_eq!(due[0].study_title, "Cell Biology");
        assert_eq!(due[0].user_email.as_deref(), Some("ada@example.com"));

        store.mark_reminder_sent(due[0].review_id).await.unwrap();
        let again = store
            .due_reminders(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_complete_review_sets_timestamp() {
        let store = MemoryStore::new();
        let source = store.insert_source(new_source(Uuid::new_v4(), "Bio")).await.unwrap();
        let reviews = store.insert_reviews(source.id, vec![Utc::now()]).await.unwrap();

        let at = Utc::now();
        let done = store.complete_review(reviews[0].id, at).await.unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(at.into()));

        let missing = store.complete_review(Uuid::new_v4(), at).await;
        assert!(matches!(missing, Err(AppError::ReviewNotFound { .. })));
    }

    #[tokio::test]
    async fn test_review_insert_fault_injection() {
        let store = MemoryStore::new();
        let source = store.insert_source(new_source(Uuid::new_v4(), "Bio")).await.unwrap();

        store.fail_review_inserts(true);
        assert!(store.insert_reviews(source.id, vec![Utc::now()]).await.is_err());
        assert!(store.list_reviews_for_source(source.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sources_listed_per_user() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.insert_source(new_source(alice, "first")).await.unwrap();
        store.insert_source(new_source(bob, "other")).await.unwrap();
        store.insert_source(new_source(alice, "second")).await.unwrap();

        let titles: Vec<String> = store
            .list_sources_for_user(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["second".to_string(), "first".to_string()]);
    }

    #[tokio::test]
    async fn test_upsert_user_keeps_known_email() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        store.upsert_user(user, Some("ada@example.com".to_string())).await.unwrap();
        store.upsert_user(user, None).await.unwrap();
        assert_eq!(store.user_count().await, 1);
        assert_eq!(
            store.find_user_email(user).await.unwrap().as_deref(),
            Some("ada@example.com")
        );

        store.upsert_user(user, Some("ada@school.edu".to_string())).await.unwrap();
        assert_eq!(
            store.find_user_email(user).await.unwrap().as_deref(),
            Some("ada@school.edu")
        );
    }

    #[tokio::test]
    async fn test_second_batch_and_plan_rejected() {
        let store = MemoryStore::new();
        let source = store.insert_source(new_source(Uuid::new_v4(), "Bio")).await.unwrap();

        store
            .insert_questions(source.id, vec!["Q1?".to_string()])
            .await
            .unwrap();
        assert!(store
            .insert_questions(source.id, vec!["Other?".to_string()])
            .await
            .is_err());
        assert_eq!(store.list_questions(source.id).await.unwrap().len(), 1);

        store.insert_plan(source.id, serde_json::json!({})).await.unwrap();
        assert!(store.insert_plan(source.id, serde_json::json!({})).await.is_err());
        assert_eq!(store.plan_count(source.id).await, 1);
    }
}
