//! Ingestion error types

use eduflow_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Content is required")]
    MissingContent,

    #[error("PDF file is required")]
    MissingFile,

    #[error("PDF file is too large. Maximum size is {}MB. Your file is {:.2}MB", whole_mib(.limit), mib(.size))]
    FileTooLarge { size: usize, limit: usize },

    #[error("Only PDF files are allowed")]
    NotPdf,

    #[error("Failed to parse PDF: {0}. Please try a different PDF file.")]
    PdfParse(String),

    #[error("No text could be extracted from the PDF. The PDF might be image-based or protected. Please use a PDF with selectable text.")]
    NoText,

    #[error("Content is too long: {len} characters exceeds limit of {limit}")]
    TextTooLong { len: usize, limit: usize },

    #[error("Invalid deadline date: {0}")]
    InvalidDeadline(String),
}

const MIB: usize = 1024 * 1024;

fn mib(bytes: &usize) -> f64 {
    *bytes as f64 / MIB as f64
}

fn whole_mib(bytes: &usize) -> usize {
    *bytes / MIB
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        let field = match &e {
            IngestionError::MissingTitle => "title",
            IngestionError::MissingContent | IngestionError::TextTooLong { .. } => "raw_text",
            IngestionError::InvalidDeadline(_) => "deadline",
            IngestionError::MissingFile
            | IngestionError::FileTooLarge { .. }
            | IngestionError::NotPdf
            | IngestionError::PdfParse(_)
            | IngestionError::NoText => "pdf_file",
        };

        AppError::invalid_field(field, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_message() {
        let e = IngestionError::FileTooLarge {
            size: 12 * MIB,
            limit: 10 * MIB,
        };
        assert_eq!(
            e.to_string(),
            "PDF file is too large. Maximum size is 10MB. Your file is 12.00MB"
        );
    }

    #[test]
    fn test_maps_to_validation() {
        let app: AppError = IngestionError::NoText.into();
        assert!(app.is_validation());
    }
}
