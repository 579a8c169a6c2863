//! Review board and completion handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;
use eduflow_common::{auth::AuthContext, errors::Result};
use eduflow_study::ReviewBoard;

/// The caller's reviews grouped into due, upcoming and completed
pub async fn review_board(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ReviewBoard>> {
    Ok(Json(state.study.review_board(auth.user_id, Utc::now()).await?))
}

/// Mark a review complete
pub async fn complete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(review_id): Path<Uuid>,
) -> Result<StatusCode> {
    state
        .study
        .complete_review(auth.user_id, review_id, Utc::now())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
