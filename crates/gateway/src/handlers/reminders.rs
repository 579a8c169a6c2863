//! Scheduled reminder trigger
//!
//! Called once a day by an external scheduler. When `auth.cron_secret` is set
//! the caller must present it as a bearer token.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;

use crate::AppState;
use eduflow_common::{auth::verify_cron_token, errors::Result};
use eduflow_study::SweepReport;

pub async fn send_review_reminders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>> {
    verify_cron_token(state.config.auth.cron_secret.as_deref(), &headers)?;

    let report = state.study.send_due_reminders(Utc::now()).await?;
    Ok(Json(report))
}
