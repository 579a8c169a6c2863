//! Transactional email abstraction
//!
//! Provides a unified interface for outbound mail:
//! - Resend HTTP API
//! - Disabled (no API key configured; sends are skipped)
//! - Recording mock for tests

pub mod templates;

use crate::config::EmailConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A rendered message ready to send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    /// Sender override; the mailer's configured sender when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            from: None,
            to: vec![to.into()],
            subject: subject.into(),
            html: html.into(),
        }
    }
}

/// Outcome of a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReceipt {
    /// Accepted by the provider
    Sent { id: String },
    /// No provider configured; nothing was sent
    Skipped,
}

/// Trait for email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt>;
}

/// Resend API client
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    from: String,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(api_key: String, base_url: String, from: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url,
            from,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt> {
        let url = format!("{}/emails", self.base_url.trim_end_matches('/'));

        let body = ResendRequest {
            from: email.from.as_deref().unwrap_or(&self.from),
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Email {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Email {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: ResendResponse = response.json().await.map_err(|e| AppError::Email {
            message: format!("Failed to parse response: {}", e),
        })?;

        tracing::debug!(email_id = %result.id, subject = %email.subject, "Email sent");
        Ok(DeliveryReceipt::Sent { id: result.id })
    }
}

/// Mailer used when no API key is configured
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt> {
        tracing::info!(subject = %email.subject, "Email service not configured, skipping email");
        Ok(DeliveryReceipt::Skipped)
    }
}

/// Mock mailer for testing
///
/// Records every accepted message. Sends to recipients in the failing set
/// return an `Email` error.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `recipient` fail
    pub async fn fail_for(&self, recipient: impl Into<String>) {
        self.failing.lock().await.insert(recipient.into());
    }

    /// Messages accepted so far
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<DeliveryReceipt> {
        {
            let failing = self.failing.lock().await;
            if let Some(bad) = email.to.iter().find(|to| failing.contains(*to)) {
                return Err(AppError::Email {
                    message: format!("delivery to {} rejected", bad),
                });
            }
        }

        let mut sent = self.sent.lock().await;
        sent.push(email);
        Ok(DeliveryReceipt::Sent {
            id: format!("mock-{}", sent.len()),
        })
    }
}

/// Create a mailer based on configuration
pub fn create_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Ok(Arc::new(ResendMailer::new(
            key.to_string(),
            config.api_base.clone(),
            config.from.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => {
            tracing::warn!("email.api_key not set, outbound email disabled");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_mailer_skips() {
        let receipt = DisabledMailer
            .send(OutgoingEmail::new("a@example.com", "Hi", "<p>x</p>"))
            .await
            .unwrap();
        assert_eq!(receipt, DeliveryReceipt::Skipped);
    }

    #[tokio::test]
    async fn test_mock_mailer_records_and_fails() {
        let mailer = MockMailer::new();
        mailer.fail_for("bad@example.com").await;

        let ok = mailer
            .send(OutgoingEmail::new("good@example.com", "Hi", "<p>x</p>"))
            .await;
        assert!(matches!(ok, Ok(DeliveryReceipt::Sent { .. })));

        let err = mailer
            .send(OutgoingEmail::new("bad@example.com", "Hi", "<p>x</p>"))
            .await;
        assert!(matches!(err, Err(AppError::Email { .. })));

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["good@example.com".to_string()]);
    }

    #[test]
    fn test_create_mailer_without_key() {
        let config = EmailConfig {
            api_key: None,
            api_base: "https://api.resend.com".to_string(),
            from: "EduFlow <onboarding@resend.dev>".to_string(),
            timeout_secs: 10,
        };
        assert!(create_mailer(&config).is_ok());
    }
}
