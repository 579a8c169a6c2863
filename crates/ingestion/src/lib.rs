//! EduFlow Content Ingestion
//!
//! Turns pasted text or an uploaded PDF into a persisted study source:
//! - Title, body, deadline and upload checks
//! - PDF text extraction
//! - Study source creation

pub mod errors;
pub mod pdf;
pub mod service;
pub mod validate;

pub use errors::IngestionError;
pub use service::{IngestionService, PdfUpload, TextSubmission};
