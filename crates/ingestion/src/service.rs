//! Study source creation

use crate::errors::IngestionError;
use crate::{pdf, validate};
use eduflow_common::config::IngestionConfig;
use eduflow_common::db::models::StudySource;
use eduflow_common::db::{NewStudySource, StudyStore};
use eduflow_common::errors::{AppError, Result};
use eduflow_common::metrics;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Pasted study material
#[derive(Debug, Clone)]
pub struct TextSubmission {
    pub title: String,
    pub raw_text: String,
    pub deadline: Option<String>,
}

/// Uploaded PDF study material
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub title: String,
    pub deadline: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Creates study sources from validated input
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn StudyStore>,
    config: IngestionConfig,
}

impl IngestionService {
    pub fn new(store: Arc<dyn StudyStore>, config: IngestionConfig) -> Self {
        Self { store, config }
    }

    /// Create a source from pasted text
    #[instrument(skip(self, submission), fields(user_id = %user_id))]
    pub async fn ingest_text(
        &self,
        user_id: Uuid,
        submission: TextSubmission,
    ) -> Result<StudySource> {
        let title = validate::title(&submission.title)?;
        let raw_text = validate::body(&submission.raw_text, self.config.max_text_chars)?;
        let deadline_date = validate::deadline(submission.deadline.as_deref())?;

        let source = self
            .store
            .insert_source(NewStudySource {
                user_id,
                title,
                raw_text,
                deadline_date,
            })
            .await?;

        metrics::record_ingestion("text");
        info!(source_id = %source.id, chars = source.raw_text.len(), "Study source created from text");

        Ok(source)
    }

    /// Create a source from an uploaded PDF
    #[instrument(skip(self, upload), fields(user_id = %user_id, size = upload.bytes.len()))]
    pub async fn ingest_pdf(&self, user_id: Uuid, upload: PdfUpload) -> Result<StudySource> {
        let title = validate::title(&upload.title)?;
        let deadline_date = validate::deadline(upload.deadline.as_deref())?;

        validate::pdf_upload(
            upload.file_name.as_deref(),
            upload.content_type.as_deref(),
            upload.bytes.len(),
            self.config.max_pdf_bytes,
        )?;

        let bytes = upload.bytes;
        let extracted = tokio::task::spawn_blocking(move || pdf::extract_text(&bytes))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("PDF extraction task failed: {}", e),
            })??;

        let raw_text = validate::body(&extracted, self.config.max_text_chars).map_err(|e| {
            match e {
                IngestionError::MissingContent => IngestionError::NoText,
                other => other,
            }
        })?;

        info!(
            file_name = upload.file_name.as_deref().unwrap_or("-"),
            chars = raw_text.len(),
            "Extracted text from PDF"
        );

        let source = self
            .store
            .insert_source(NewStudySource {
                user_id,
                title,
                raw_text,
                deadline_date,
            })
            .await?;

        metrics::record_ingestion("pdf");
        info!(source_id = %source.id, "Study source created from PDF");

        Ok(source)
    }
}
