//! EduFlow Study Pipeline
//!
//! Everything that happens to a study source after ingestion:
//! - Diagnostic question generation
//! - Answer feedback
//! - Macro/meso/micro learning plans and their review schedule
//! - Review reminders and completion
//! - Dashboard and review board read models
//!
//! [`StudyService`] owns the injected store, completion client and mailer.
//! Each pipeline step lives in its own module as an `impl StudyService` block.

pub mod answers;
pub mod diagnostic;
pub mod plan;
pub mod progress;
pub mod prompts;
pub mod reminders;
pub mod reviews;
pub mod scheduler;

pub use answers::AnswerSubmission;
pub use diagnostic::DiagnosticOutcome;
pub use plan::{PlanOutcome, PlanTree};
pub use progress::{PlanView, SourceDetail, SourceProgress};
pub use reminders::SweepReport;
pub use reviews::{ReviewBoard, ReviewItem};

use eduflow_common::config::AppConfig;
use eduflow_common::db::models::StudySource;
use eduflow_common::errors::{AppError, Result};
use eduflow_common::{Completer, Mailer, StudyStore};
use std::sync::Arc;
use uuid::Uuid;

/// Tunables of the pipeline
#[derive(Debug, Clone)]
pub struct StudySettings {
    pub temperature: f32,
    pub feedback_max_tokens: u32,
    pub require_all_answers: bool,
    pub send_plan_email: bool,
    /// Base URL for links inside emails
    pub public_url: String,
}

impl StudySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temperature: config.llm.temperature,
            feedback_max_tokens: config.llm.feedback_max_tokens,
            require_all_answers: config.study.require_all_answers,
            send_plan_email: config.study.send_plan_email,
            public_url: config.server.public_url.clone(),
        }
    }
}

impl Default for StudySettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// The study pipeline
#[derive(Clone)]
pub struct StudyService {
    store: Arc<dyn StudyStore>,
    completer: Arc<dyn Completer>,
    mailer: Arc<dyn Mailer>,
    settings: StudySettings,
}

impl StudyService {
    pub fn new(
        store: Arc<dyn StudyStore>,
        completer: Arc<dyn Completer>,
        mailer: Arc<dyn Mailer>,
        settings: StudySettings,
    ) -> Self {
        Self {
            store,
            completer,
            mailer,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn StudyStore> {
        &self.store
    }

    pub fn settings(&self) -> &StudySettings {
        &self.settings
    }

    /// Load a source the caller owns. Someone else's source reads as missing.
    pub async fn owned_source(&self, user_id: Uuid, source_id: Uuid) -> Result<StudySource> {
        match self.store.find_source(source_id).await? {
            Some(source) if source.is_owned_by(user_id) => Ok(source),
            _ => Err(AppError::SourceNotFound {
                id: source_id.to_string(),
            }),
        }
    }
}

/// Display name from an email's local part
pub(crate) fn name_from_email(email: &str) -> Option<&str> {
    email.split('@').next().filter(|name| !name.is_empty())
}
