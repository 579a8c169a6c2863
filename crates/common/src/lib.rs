//! EduFlow Common Library
//!
//! Shared code for all EduFlow crates including:
//! - Datastore entities, the `StudyStore` trait and its implementations
//! - Completion client abstraction
//! - Transactional email client and templates
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
pub mod llm;
pub mod metrics;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{Repository, StudyStore};
pub use email::Mailer;
pub use llm::Completer;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
