//! Chat completion client for OpenAI-compatible APIs.
//!
//! The pipeline only ever needs one text completion per call, so the
//! [`CompletionService`] seam is a single method. [`ChatClient`] implements
//! it over HTTP with a per-request timeout and bounded retry of transient
//! failures.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::{ClientConfig, ModelConfig};
use crate::error::{AgentError, Result};

/// Base delay between retries; doubled on each attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Longest single wait between retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(8);

/// Delay before retry number `attempt` (zero-based).
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY
        .checked_mul(2u32.saturating_pow(attempt))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}

/// Produces one text completion for a role-tagged message list.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run a completion and return the assistant's text.
    async fn complete(&self, config: &ModelConfig, messages: Vec<ChatMessage>) -> Result<String>;
}

/// HTTP client for chat completions.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ChatClient {
    /// Create a new client from connection settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Connection settings in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a single chat completion request, without retry.
    pub async fn chat(&self, config: &ModelConfig, messages: Vec<ChatMessage>) -> Result<ChatResponse> {
        let request = ChatRequest {
            model: config.model.clone(),
            messages,
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
        };

        trace!("Sending chat request: {:?}", request);

        let response = self
            .client
            .post(self.config.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "DSA Mentor")
            .json(&request)
            .send()
            .await
            .map_err(AgentError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ResponseParse(format!("Failed to parse response: {}", e)))?;

        debug!(
            "Chat response received: {} tokens used",
            response.usage.as_ref().map_or(0, |u| u.total_tokens)
        );

        Ok(response)
    }
}

#[async_trait]
impl CompletionService for ChatClient {
    async fn complete(&self, config: &ModelConfig, messages: Vec<ChatMessage>) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.chat(config, messages.clone()).await {
                Ok(response) => return response.text().ok_or(AgentError::EmptyCompletion),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = retry_delay(attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying completion request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<ChatMessage>,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in the chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: String,

    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Unique identifier for this completion.
    #[serde(default)]
    pub id: String,

    /// Completion choices.
    pub choices: Vec<ChatChoice>,

    /// Token usage information.
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    /// Text of the first choice, if any.
    pub fn text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
    }
}

/// A choice in the completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Index of this choice.
    #[serde(default)]
    pub index: u32,

    /// The message for this choice.
    pub message: ResponseMessage,

    /// Finish reason (stop, length, etc.).
    pub finish_reason: Option<String>,
}

/// Message in a completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Role (always "assistant" for responses).
    pub role: String,

    /// Text content of the response.
    pub content: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_then_caps() {
        assert_eq!(retry_delay(0), Duration::from_millis(500));
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(3), Duration::from_secs(4));
        assert_eq!(retry_delay(4), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(31), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(u32::MAX), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_chat_message_constructors() {
        let system = ChatMessage::system("You are a mentor.");
        assert_eq!(system.role, "system");
        assert_eq!(system.content, "You are a mentor.");

        let user = ChatMessage::user("Review my code");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            max_tokens: None,
            temperature: Some(0.2),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "id": "gen-123",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Consider a hash map."
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15
            }
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, "gen-123");
        assert_eq!(response.text().as_deref(), Some("Consider a hash map."));
    }

    #[test]
    fn test_response_without_content() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "length"}],
            "usage": null
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());
    }
}
