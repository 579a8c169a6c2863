//! Review reminder sweep
//!
//! Finds pending reviews scheduled for the current UTC day that have not been
//! reminded yet, and emails each owner. Every review is dispatched
//! concurrently; one failure never affects the others.

use crate::{name_from_email, StudyService};
use chrono::{DateTime, Duration, Utc};
use eduflow_common::db::DueReminder;
use eduflow_common::email::templates::ReviewReminder;
use eduflow_common::errors::{AppError, Result};
use eduflow_common::metrics;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Aggregate outcome of one sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub message: String,
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
}

/// `[start, end)` of the UTC calendar day containing `now`
pub fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);
    (start, start + Duration::days(1))
}

impl StudyService {
    /// Send today's review reminders
    #[instrument(skip(self))]
    pub async fn send_due_reminders(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let (start, end) = day_window(now);
        let due = self.store.due_reminders(start, end).await?;

        if due.is_empty() {
            info!("No reviews scheduled for today");
            return Ok(SweepReport {
                message: "No reviews scheduled for today".to_string(),
                sent: 0,
                failed: 0,
                total: 0,
            });
        }

        let outcomes = join_all(due.iter().map(|item| self.dispatch_reminder(item))).await;

        let mut sent = 0;
        let mut failed = 0;
        for (item, outcome) in due.iter().zip(outcomes) {
            match outcome {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    warn!(review_id = %item.review_id, error = %e, "Review reminder failed");
                }
            }
        }

        metrics::record_reminders(sent, failed);
        info!(sent, failed, total = due.len(), "Review reminders processed");

        Ok(SweepReport {
            message: "Review reminders processed".to_string(),
            sent,
            failed,
            total: due.len(),
        })
    }

    async fn dispatch_reminder(&self, item: &DueReminder) -> Result<()> {
        let email = item
            .user_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Email {
                message: format!("No email address for user {}", item.user_id),
            })?;

        let message = ReviewReminder {
            to: email,
            user_name: name_from_email(email),
            study_title: &item.study_title,
            study_source_id: item.study_source_id,
            scheduled_at: item.scheduled_at.with_timezone(&Utc),
            review_number: item.review_number,
            base_url: &self.settings.public_url,
        }
        .render();

        // A skipped send (mail disabled) still counts as handled
        self.mailer.send(message).await?;
        self.store.mark_reminder_sent(item.review_id).await
    }
}
