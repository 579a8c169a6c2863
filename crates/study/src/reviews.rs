//! Review completion and the review board

use crate::StudyService;
use chrono::{DateTime, FixedOffset, Utc};
use eduflow_common::db::models::Review;
use eduflow_common::errors::{AppError, Result};
use eduflow_common::metrics;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// A review with its source title, as shown on the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub id: Uuid,
    pub study_source_id: Uuid,
    pub study_title: String,
    pub scheduled_at: DateTime<FixedOffset>,
    pub completed: bool,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub reminder_sent: bool,
}

/// The caller's reviews by state, each group ordered by scheduled time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewBoard {
    pub due: Vec<ReviewItem>,
    pub upcoming: Vec<ReviewItem>,
    pub completed: Vec<ReviewItem>,
}

impl StudyService {
    /// Mark a review complete.
    ///
    /// Completing twice overwrites `completed_at`. A review whose source
    /// belongs to someone else reads as missing.
    #[instrument(skip(self), fields(user_id = %user_id, review_id = %review_id))]
    pub async fn complete_review(
        &self,
        user_id: Uuid,
        review_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Review> {
        let not_found = || AppError::ReviewNotFound {
            id: review_id.to_string(),
        };

        let review = self.store.find_review(review_id).await?.ok_or_else(not_found)?;

        let owned = self
            .store
            .find_source(review.study_source_id)
            .await?
            .is_some_and(|s| s.is_owned_by(user_id));
        if !owned {
            return Err(not_found());
        }

        let review = self.store.complete_review(review_id, at).await?;
        metrics::record_review_completed();
        info!("Review completed");

        Ok(review)
    }

    /// Build the review board for the caller
    pub async fn review_board(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<ReviewBoard> {
        let titles: HashMap<Uuid, String> = self
            .store
            .list_sources_for_user(user_id)
            .await?
            .into_iter()
            .map(|s| (s.id, s.title))
            .collect();

        let mut board = ReviewBoard::default();
        for review in self.store.list_reviews_for_user(user_id).await? {
            let item = ReviewItem {
                id: review.id,
                study_source_id: review.study_source_id,
                study_title: titles
                    .get(&review.study_source_id)
                    .cloned()
                    .unwrap_or_default(),
                scheduled_at: review.scheduled_at,
                completed: review.completed,
                completed_at: review.completed_at,
                reminder_sent: review.reminder_sent,
            };

            if review.completed {
                board.completed.push(item);
            } else if review.is_due(now.into()) {
                board.due.push(item);
            } else {
                board.upcoming.push(item);
            }
        }

        for group in [&mut board.due, &mut board.upcoming, &mut board.completed] {
            group.sort_by_key(|r| r.scheduled_at);
        }

        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::harness;
    use chrono::Duration;
    use eduflow_common::StudyStore;

    #[tokio::test]
    async fn test_complete_sets_timestamp_and_overwrites() {
        let h = harness();
        let user = Uuid::new_v4();
        let source = h.source(user, "Bio", "Body").await;
        let reviews = h.store.insert_reviews(source.id, vec![Utc::now()]).await.unwrap();

        let first_at = Utc::now();
        let done = h.service.complete_review(user, reviews[0].id, first_at).await.unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(first_at.into()));

        let later = first_at + Duration::minutes(5);
        let again = h.service.complete_review(user, reviews[0].id, later).await.unwrap();
        assert_eq!(again.completed_at, Some(later.into()));
    }

    #[tokio::test]
    async fn test_foreign_review_not_found() {
        let h = harness();
        let owner = Uuid::new_v4();
        let source = h.source(owner, "Bio", "Body").await;
        let reviews = h.store.insert_reviews(source.id, vec![Utc::now()]).await.unwrap();

        let err = h
            .service
            .complete_review(Uuid::new_v4(), reviews[0].id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReviewNotFound { .. }));

        let untouched = h.store.find_review(reviews[0].id).await.unwrap().unwrap();
        assert!(!untouched.completed);
    }

    #[tokio::test]
    async fn test_board_groups() {
        let h = harness();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let source = h.source(user, "Cell Biology", "Body").await;
        let reviews = h
            .store
            .insert_reviews(
                source.id,
                vec![
                    now - Duration::days(1),
                    now + Duration::days(3),
                    now - Duration::days(2),
                    now + Duration::days(1),
                ],
            )
            .await
            .unwrap();
        h.store.complete_review(reviews[2].id, now).await.unwrap();

        // Someone else's review never shows up
        let other = h.source(Uuid::new_v4(), "Other", "Body").await;
        h.store.insert_reviews(other.id, vec![now]).await.unwrap();

        let board = h.service.review_board(user, now).await.unwrap();
        assert_eq!(board.due.len(), 1);
        assert_eq!(board.completed.len(), 1);
        assert_eq!(board.upcoming.len(), 2);
        assert_eq!(board.due[0].study_title, "Cell Biology");
        assert!(board.upcoming[0].scheduled_at < board.upcoming[1].scheduled_at);
    }
}
