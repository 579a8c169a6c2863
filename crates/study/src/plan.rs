//! Learning plan generation and review scheduling

use crate::{name_from_email, prompts, scheduler, StudyService};
use chrono::{DateTime, Utc};
use eduflow_common::db::models::{DiagnosticAnswer, DiagnosticQuestion, Review, StudyPlan, StudySource};
use eduflow_common::email::templates::{PlanReady, ScheduleEntry};
use eduflow_common::errors::{AppError, Result};
use eduflow_common::llm::CompletionRequest;
use eduflow_common::metrics;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Macro/meso/micro curriculum tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTree {
    #[serde(rename = "macro")]
    pub macros: Vec<MacroNode>,
    pub meso: Vec<MesoNode>,
    pub micro: Vec<MicroNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroNode {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Models sometimes emit fractional or float-typed numbers here
    pub order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MesoNode {
    pub id: String,
    pub macro_id: String,
    pub title: String,
    pub description: String,
    pub order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroNode {
    pub id: String,
    pub meso_id: String,
    pub title: String,
    pub description: String,
    pub estimated_minutes: f64,
    pub order: f64,
}

impl PlanTree {
    /// Unique ids per level, and every parent reference resolves
    pub fn validate(&self) -> Result<()> {
        if self.macros.is_empty() {
            return Err(AppError::generation("Plan has no macro objectives"));
        }

        let macro_ids = unique_ids("macro", self.macros.iter().map(|n| n.id.as_str()))?;
        let meso_ids = unique_ids("meso", self.meso.iter().map(|n| n.id.as_str()))?;
        unique_ids("micro", self.micro.iter().map(|n| n.id.as_str()))?;

        if let Some(orphan) = self.meso.iter().find(|n| !macro_ids.contains(n.macro_id.as_str())) {
            return Err(AppError::generation(format!(
                "Meso node {} references unknown macro {}",
                orphan.id, orphan.macro_id
            )));
        }

        if let Some(orphan) = self.micro.iter().find(|n| !meso_ids.contains(n.meso_id.as_str())) {
            return Err(AppError::generation(format!(
                "Micro node {} references unknown meso {}",
                orphan.id, orphan.meso_id
            )));
        }

        Ok(())
    }

    /// Total estimated minutes of all micro tasks
    pub fn total_minutes(&self) -> u32 {
        let total: f64 = self.micro.iter().map(|n| n.estimated_minutes).sum();
        total.max(0.0).round() as u32
    }
}

fn unique_ids<'a>(level: &str, ids: impl Iterator<Item = &'a str>) -> Result<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::generation(format!(
                "Duplicate {} id in plan: {}",
                level, id
            )));
        }
    }
    Ok(seen)
}

/// Parse and check the model reply. Returns the reply as stored and its typed view.
pub fn parse_plan(reply: Option<&str>) -> Result<(serde_json::Value, PlanTree)> {
    let text = reply
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::generation("No response from the completion service"))?;

    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| AppError::generation(format!("Plan is not valid JSON: {}", e)))?;

    let tree: PlanTree = serde_json::from_value(value.clone())
        .map_err(|e| AppError::generation(format!("Plan does not match the expected shape: {}", e)))?;

    tree.validate()?;
    Ok((value, tree))
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    /// False when a plan already existed and nothing was generated
    pub created: bool,
    pub plan: StudyPlan,
    pub reviews: Vec<Review>,
}

impl StudyService {
    /// Generate the learning plan of a source, once, and schedule its reviews.
    ///
    /// Review scheduling and the plan-ready email are best effort: their
    /// failures are logged and the plan still counts as created.
    pub async fn generate_plan(&self, user_id: Uuid, source_id: Uuid) -> Result<PlanOutcome> {
        self.generate_plan_at(user_id, source_id, Utc::now()).await
    }

    /// [`Self::generate_plan`] with reviews offset from `now`
    #[instrument(skip(self), fields(user_id = %user_id, source_id = %source_id))]
    pub(crate) async fn generate_plan_at(
        &self,
        user_id: Uuid,
        source_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PlanOutcome> {
        let source = self.owned_source(user_id, source_id).await?;

        if let Some(plan) = self.store.find_plan(source.id).await? {
            info!("Study plan already exists, skipping generation");
            return Ok(PlanOutcome {
                created: false,
                plan,
                reviews: self.store.list_reviews_for_source(source.id).await?,
            });
        }

        let pairs = self.questions_with_answers(source.id).await?;
        if self.settings.require_all_answers && pairs.iter().any(|(_, a)| a.is_none()) {
            return Err(AppError::validation(
                "Answer every diagnostic question before generating a plan",
            ));
        }

        let request = CompletionRequest::new(
            prompts::PLAN_SYSTEM,
            prompts::plan_user(&source, &prompts::diagnostic_results(&pairs)),
            self.settings.temperature,
        )
        .json();

        let start = Instant::now();
        let parsed = match self.completer.complete(request).await {
            Ok(reply) => parse_plan(reply.as_deref()),
            Err(e) => Err(e),
        };
        metrics::record_generation("plan", start.elapsed().as_secs_f64(), parsed.is_ok());
        let (plan_json, tree) = parsed?;

        let plan = self.store.insert_plan(source.id, plan_json).await?;
        info!(
            plan_id = %plan.id,
            macro_count = tree.macros.len(),
            micro_count = tree.micro.len(),
            total_minutes = tree.total_minutes(),
            "Study plan created"
        );

        let reviews = self.schedule_reviews(source.id, now).await;
        self.notify_plan_ready(&source, &reviews).await;

        Ok(PlanOutcome {
            created: true,
            plan,
            reviews,
        })
    }

    /// Questions in order, each with its oldest answer
    pub(crate) async fn questions_with_answers(
        &self,
        source_id: Uuid,
    ) -> Result<Vec<(DiagnosticQuestion, Option<DiagnosticAnswer>)>> {
        let questions = self.store.list_questions(source_id).await?;
        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();

        let mut first: HashMap<Uuid, DiagnosticAnswer> = HashMap::new();
        for answer in self.store.list_answers(&ids).await? {
            first.entry(answer.question_id).or_insert(answer);
        }

        Ok(questions
            .into_iter()
            .map(|q| {
                let answer = first.remove(&q.id);
                (q, answer)
            })
            .collect())
    }

    async fn schedule_reviews(&self, source_id: Uuid, now: DateTime<Utc>) -> Vec<Review> {
        match self
            .store
            .insert_reviews(source_id, scheduler::review_times(now))
            .await
        {
            Ok(reviews) => {
                info!(review_count = reviews.len(), "Reviews scheduled");
                reviews
            }
            Err(e) => {
                warn!(error = %e, "Failed to schedule reviews, plan kept without them");
                Vec::new()
            }
        }
    }

    async fn notify_plan_ready(&self, source: &StudySource, reviews: &[Review]) {
        if !self.settings.send_plan_email {
            return;
        }

        let email = match self.store.find_user_email(source.user_id).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                info!("Owner has no email address, skipping plan notification");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to look up owner email");
                return;
            }
        };

        let schedule: Vec<ScheduleEntry> = reviews
            .iter()
            .enumerate()
            .map(|(i, r)| ScheduleEntry {
                at: r.scheduled_at.with_timezone(&Utc),
                description: scheduler::review_label(i),
            })
            .collect();

        let message = PlanReady {
            to: &email,
            user_name: name_from_email(&email),
            study_title: &source.title,
            study_source_id: source.id,
            schedule: &schedule,
            base_url: &self.settings.public_url,
        }
        .render();

        if let Err(e) = self.mailer.send(message).await {
            warn!(error = %e, "Failed to send plan-ready email");
        }
    }
}
