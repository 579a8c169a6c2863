//! Input checks applied before anything is persisted

use crate::errors::IngestionError;
use chrono::NaiveDate;

pub const PDF_MIME: &str = "application/pdf";

/// Trimmed, non-empty title
pub fn title(raw: &str) -> Result<String, IngestionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::MissingTitle);
    }
    Ok(trimmed.to_string())
}

/// Trimmed, non-empty body within `max_chars`
pub fn body(raw: &str, max_chars: usize) -> Result<String, IngestionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::MissingContent);
    }

    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(IngestionError::TextTooLong {
            len,
            limit: max_chars,
        });
    }

    Ok(trimmed.to_string())
}

/// Optional `YYYY-MM-DD` deadline; blank means none
pub fn deadline(raw: Option<&str>) -> Result<Option<NaiveDate>, IngestionError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| IngestionError::InvalidDeadline(s.to_string())),
    }
}

/// Size and type checks for an uploaded PDF. Runs before extraction.
pub fn pdf_upload(
    file_name: Option<&str>,
    content_type: Option<&str>,
    size: usize,
    max_bytes: usize,
) -> Result<(), IngestionError> {
    if size == 0 {
        return Err(IngestionError::MissingFile);
    }

    if size > max_bytes {
        return Err(IngestionError::FileTooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mime_ok = content_type
        .map(|ct| ct.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false);
    let ext_ok = file_name
        .map(|name| name.to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);

    if !mime_ok && !ext_ok {
        return Err(IngestionError::NotPdf);
    }

    Ok(())
}
