//! Study source handlers: text and PDF ingestion, dashboard, detail

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::invalid_request;
use crate::AppState;
use eduflow_common::{
    auth::AuthContext,
    errors::{AppError, Result},
};
use eduflow_ingestion::{PdfUpload, TextSubmission};
use eduflow_study::{SourceDetail, SourceProgress};

const MIB: usize = 1024 * 1024;

/// Request to create a source from pasted text
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSourceRequest {
    #[validate(length(max = 500))]
    pub title: String,

    pub raw_text: String,

    /// `YYYY-MM-DD`
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Response after creating a source
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedSource {
    pub id: Uuid,
}

/// Create a study source from pasted text
pub async fn create_source(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateSourceRequest>,
) -> Result<(StatusCode, Json<CreatedSource>)> {
    request.validate().map_err(invalid_request)?;
    state.store.upsert_user(auth.user_id, auth.email.clone()).await?;

    let source = state
        .ingestion
        .ingest_text(
            auth.user_id,
            TextSubmission {
                title: request.title,
                raw_text: request.raw_text,
                deadline: request.deadline,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedSource { id: source.id })))
}

/// Create a study source from an uploaded PDF.
///
/// Multipart fields: `title`, optional `deadline`, `pdf_file`.
pub async fn upload_source(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedSource>)> {
    let limit = state.config.ingestion.max_pdf_bytes;
    let read_error = |err: MultipartError| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::invalid_field(
                "pdf_file",
                format!("PDF file is too large. Maximum size is {}MB", limit / MIB),
            )
        } else {
            AppError::validation(err.body_text())
        }
    };

    let mut upload = PdfUpload {
        title: String::new(),
        deadline: None,
        file_name: None,
        content_type: None,
        bytes: Vec::new(),
    };

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => upload.title = field.text().await.map_err(read_error)?,
            "deadline" => {
                let deadline = field.text().await.map_err(read_error)?;
                upload.deadline = Some(deadline).filter(|d| !d.trim().is_empty());
            }
            "pdf_file" => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = field.bytes().await.map_err(read_error)?.to_vec();
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    state.store.upsert_user(auth.user_id, auth.email.clone()).await?;
    let source = state.ingestion.ingest_pdf(auth.user_id, upload).await?;

    Ok((StatusCode::CREATED, Json(CreatedSource { id: source.id })))
}

/// Dashboard: every source of the caller with progress counts
pub async fn list_sources(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<SourceProgress>>> {
    Ok(Json(state.study.dashboard(auth.user_id).await?))
}

/// A source with its diagnostic questions and answers
pub async fn get_source(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SourceDetail>> {
    Ok(Json(state.study.source_detail(auth.user_id, id).await?))
}
