//! Learning plan handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::AppState;
use eduflow_common::{auth::AuthContext, errors::Result};
use eduflow_study::{PlanOutcome, PlanView};

/// Generate the learning plan of a source and schedule its reviews.
///
/// 201 when a plan was generated, 200 when one already existed.
pub async fn generate_plan(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(source_id): Path<Uuid>,
) -> Result<(StatusCode, Json<PlanOutcome>)> {
    let outcome = state.study.generate_plan(auth.user_id, source_id).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(outcome)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(source_id): Path<Uuid>,
) -> Result<Json<PlanView>> {
    Ok(Json(state.study.plan_view(auth.user_id, source_id).await?))
}
