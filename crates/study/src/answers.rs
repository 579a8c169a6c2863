//! Answer collection with generated feedback

use crate::{prompts, StudyService};
use eduflow_common::db::models::DiagnosticAnswer;
use eduflow_common::errors::{AppError, Result};
use eduflow_common::llm::CompletionRequest;
use eduflow_common::metrics;
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    pub answer: String,
}

impl StudyService {
    /// Store an answer together with its feedback.
    ///
    /// Nothing is stored when feedback generation fails. Repeated submissions
    /// for one question each create a row; readers use the oldest.
    #[instrument(
        skip(self, submission),
        fields(user_id = %user_id, source_id = %source_id, question_id = %submission.question_id)
    )]
    pub async fn submit_answer(
        &self,
        user_id: Uuid,
        source_id: Uuid,
        submission: AnswerSubmission,
    ) -> Result<DiagnosticAnswer> {
        let answer = submission.answer.trim();
        if answer.is_empty() {
            return Err(AppError::invalid_field("answer", "Answer is required"));
        }

        let source = self.owned_source(user_id, source_id).await?;

        let question = self
            .store
            .find_question(submission.question_id)
            .await?
            .filter(|q| q.study_source_id == source.id)
            .ok_or_else(|| AppError::QuestionNotFound {
                id: submission.question_id.to_string(),
            })?;

        let request = CompletionRequest::new(
            prompts::FEEDBACK_SYSTEM,
            prompts::feedback_user(&source, &question.question, answer),
            self.settings.temperature,
        )
        .with_max_tokens(self.settings.feedback_max_tokens);

        let start = Instant::now();
        let feedback = match self.completer.complete(request).await {
            Ok(reply) => reply
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .ok_or_else(|| AppError::generation("No feedback from the completion service")),
            Err(e) => Err(e),
        };
        metrics::record_generation("feedback", start.elapsed().as_secs_f64(), feedback.is_ok());
        let feedback = feedback?;

        let stored = self
            .store
            .insert_answer(question.id, answer.to_string(), feedback)
            .await?;

        info!(answer_id = %stored.id, "Answer recorded");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, questions_json};
    use eduflow_common::llm::MockReply;
    use eduflow_common::StudyStore;

    async fn seeded() -> (crate::testing::Harness, Uuid, Uuid, Uuid) {
        let h = harness();
        let user = Uuid::new_v4();
        let source = h.source(user, "Cell Biology", "Cells divide.").await;
        h.completer.push_text(questions_json(8)).await;
        let outcome = h.service.generate_questions(user, source.id).await.unwrap();
        let question_id = outcome.questions[0].id;
        (h, user, source.id, question_id)
    }

    #[tokio::test]
    async fn test_answer_stored_with_feedback() {
        let (h, user, source_id, question_id) = seeded().await;
        h.completer.push_text("  Good start. Mention mitosis. ").await;

        let answer = h
            .service
            .submit_answer(
                user,
                source_id,
                AnswerSubmission {
                    question_id,
                    answer: " They split ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(answer.user_answer, "They split");
        assert_eq!(answer.ai_feedback, "Good start. Mention mitosis.");

        let requests = h.completer.requests().await;
        let feedback_req = &requests[1];
        assert_eq!(feedback_req.max_tokens, Some(150));
        assert!(feedback_req
            .user_prompt()
            .starts_with("Study Material: \"Cell Biology\"\n\nQuestion: Question 1?"));
        assert!(feedback_req.user_prompt().contains("Student Answer: They split"));
    }

    #[tokio::test]
    async fn test_feedback_failure_stores_nothing() {
        let (h, user, source_id, question_id) = seeded().await;
        h.completer.push(MockReply::Fail("timeout".to_string())).await;

        let result = h
            .service
            .submit_answer(
                user,
                source_id,
                AnswerSubmission {
                    question_id,
                    answer: "They split".to_string(),
                },
            )
            .await;
        assert!(result.is_err());
        assert!(h.store.list_answers(&[question_id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_submissions_are_kept() {
        let (h, user, source_id, question_id) = seeded().await;
        h.completer.push_text("First feedback").await;
        h.completer.push_text("Second feedback").await;

        for text in ["one", "two"] {
            h.service
                .submit_answer(
                    user,
                    source_id,
                    AnswerSubmission {
                        question_id,
                        answer: text.to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let answers = h.store.list_answers(&[question_id]).await.unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].user_answer, "one");
    }

    #[tokio::test]
    async fn test_blank_answer_rejected_before_completion() {
        let (h, user, source_id, question_id) = seeded().await;

        let err = h
            .service
            .submit_answer(
                user,
                source_id,
                AnswerSubmission {
                    question_id,
                    answer: "   ".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.completer.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_question_from_other_source_is_not_found() {
        let (h, user, _source_id, question_id) = seeded().await;
        let other = h.source(user, "Other", "Body").await;

        let err = h
            .service
            .submit_answer(
                user,
                other.id,
                AnswerSubmission {
                    question_id,
                    answer: "x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QuestionNotFound { .. }));
    }
}
