//! Diagnostic question generation

use crate::{prompts, StudyService};
use eduflow_common::db::models::DiagnosticQuestion;
use eduflow_common::errors::{AppError, Result};
use eduflow_common::llm::CompletionRequest;
use eduflow_common::metrics;
use serde::Serialize;
use std::ops::RangeInclusive;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Question count the prompt asks for
pub const EXPECTED_QUESTIONS: RangeInclusive<usize> = 8..=10;

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticOutcome {
    /// False when questions already existed and nothing was generated
    pub created: bool,
    pub questions: Vec<DiagnosticQuestion>,
}

impl StudyService {
    /// Generate the diagnostic questions of a source, once.
    ///
    /// A source that already has questions is left untouched.
    #[instrument(skip(self), fields(user_id = %user_id, source_id = %source_id))]
    pub async fn generate_questions(
        &self,
        user_id: Uuid,
        source_id: Uuid,
    ) -> Result<DiagnosticOutcome> {
        let source = self.owned_source(user_id, source_id).await?;

        if self.store.has_questions(source.id).await? {
            info!("Diagnostic questions already exist, skipping generation");
            return Ok(DiagnosticOutcome {
                created: false,
                questions: self.store.list_questions(source.id).await?,
            });
        }

        let request = CompletionRequest::new(
            prompts::DIAGNOSTIC_SYSTEM,
            prompts::diagnostic_user(&source),
            self.settings.temperature,
        );

        let start = Instant::now();
        let parsed = match self.completer.complete(request).await {
            Ok(reply) => parse_questions(reply.as_deref()),
            Err(e) => Err(e),
        };
        metrics::record_generation("diagnostic", start.elapsed().as_secs_f64(), parsed.is_ok());
        let questions = parsed?;

        if !EXPECTED_QUESTIONS.contains(&questions.len()) {
            warn!(
                question_count = questions.len(),
                "Model returned an unexpected number of questions"
            );
        }

        let questions = self.store.insert_questions(source.id, questions).await?;
        info!(question_count = questions.len(), "Diagnostic questions generated");

        Ok(DiagnosticOutcome {
            created: true,
            questions,
        })
    }
}

/// Parse the model reply as a JSON array of non-blank strings
pub fn parse_questions(reply: Option<&str>) -> Result<Vec<String>> {
    let text = reply
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::generation("No response from the completion service"))?;

    let questions: Vec<String> = serde_json::from_str(text).map_err(|e| {
        AppError::generation(format!("Questions are not a JSON array of strings: {}", e))
    })?;

    if questions.is_empty() {
        return Err(AppError::generation("Model returned no questions"));
    }

    questions
        .into_iter()
        .map(|q| {
            let q = q.trim().to_string();
            if q.is_empty() {
                Err(AppError::generation("Model returned a blank question"))
            } else {
                Ok(q)
            }
        })
        .collect()
}
