//! Chat completion abstraction
//!
//! The study pipeline asks a hosted chat model for diagnostic questions,
//! answer feedback and learning plans. Providers:
//! - OpenAI-compatible `/chat/completions`
//! - Scripted mock for tests

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object response
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
            max_tokens: None,
            json_mode: false,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Content of the last user message
    pub fn user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Trait for chat completion
#[async_trait]
pub trait Completer: Send + Sync {
    /// Run one completion. `Ok(None)` means the provider answered without content.
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI chat completion client
pub struct OpenAICompleter {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl OpenAICompleter {
    /// Create a new OpenAI completer
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }

    async fn make_request(&self, request: &CompletionRequest) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Completion {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Completion {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: ChatResponse = response.json().await.map_err(|e| AppError::Completion {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }
}

#[async_trait]
impl Completer for OpenAICompleter {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>> {
        let start = Instant::now();
        let result = self.make_request(&request).await;

        metrics::record_completion(start.elapsed().as_secs_f64(), &self.model, result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(model = %self.model, error = %e, "Completion request failed");
        }

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted reply for [`MockCompleter`]
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Provider answered without content
    Empty,
    /// Provider call failed
    Fail(String),
}

/// Mock completer for testing
///
/// Replies are consumed in order; every request is recorded.
#[derive(Default)]
pub struct MockCompleter {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with a queue of text replies
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| MockReply::Text(r.into())).collect()),
            requests: Mutex::default(),
        }
    }

    pub async fn push(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn push_text(&self, text: impl Into<String>) {
        self.push(MockReply::Text(text.into())).await;
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>> {
        self.requests.lock().await.push(request);

        match self.replies.lock().await.pop_front() {
            Some(MockReply::Text(text)) => Ok(Some(text)),
            Some(MockReply::Empty) => Ok(None),
            Some(MockReply::Fail(message)) => Err(AppError::Completion { message }),
            None => Err(AppError::Completion {
                message: "no scripted reply".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-completion"
    }
}

/// Create a completer based on configuration
pub fn create_completer(config: &LlmConfig) -> Result<Arc<dyn Completer>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AppError::Configuration {
                    message: "llm.api_key is required for the openai provider".to_string(),
                })?;

            Ok(Arc::new(OpenAICompleter::new(
                key,
                config.model.clone(),
                config.api_base.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        "mock" => Ok(Arc::new(MockCompleter::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown completion provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replies_in_order() {
        let completer = MockCompleter::with_replies(["first", "second"]);
        completer.push(MockReply::Empty).await;

        let req = CompletionRequest::new("sys", "hello", 0.7);
        assert_eq!(completer.complete(req.clone()).await.unwrap().as_deref(), Some("first"));
        assert_eq!(completer.complete(req.clone()).await.unwrap().as_deref(), Some("second"));
        assert_eq!(completer.complete(req.clone()).await.unwrap(), None);
        assert!(completer.complete(req).await.is_err());

        let seen = completer.requests().await;
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].user_prompt(), "hello");
    }

    #[test]
    fn test_request_serialization() {
        let req = CompletionRequest::new("sys", "user", 0.7)
            .with_max_tokens(150)
            .json();
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: &req.messages,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            response_format: req.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_openai_requires_key() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key: None,
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            feedback_max_tokens: 150,
            timeout_secs: 60,
        };
        assert!(matches!(
            create_completer(&config),
            Err(AppError::Configuration { .. })
        ));
    }
}
