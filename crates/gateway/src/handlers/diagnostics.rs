//! Diagnostic question and answer handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::invalid_request;
use crate::AppState;
use eduflow_common::{auth::AuthContext, db::models::DiagnosticAnswer, errors::Result};
use eduflow_study::{AnswerSubmission, DiagnosticOutcome};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,

    #[validate(length(max = 20000))]
    pub answer: String,
}

/// Generate the diagnostic questions of a source.
///
/// 201 when questions were generated, 200 when they already existed.
pub async fn generate_questions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(source_id): Path<Uuid>,
) -> Result<(StatusCode, Json<DiagnosticOutcome>)> {
    let outcome = state.study.generate_questions(auth.user_id, source_id).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(outcome)))
}

/// Answer one diagnostic question and get feedback
pub async fn submit_answer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(source_id): Path<Uuid>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<(StatusCode, Json<DiagnosticAnswer>)> {
    request.validate().map_err(invalid_request)?;

    let answer = state
        .study
        .submit_answer(
            auth.user_id,
            source_id,
            AnswerSubmission {
                question_id: request.question_id,
                answer: request.answer,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(answer)))
}
