//! Configuration for the completion service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Environment variable for the completion API key.
pub const API_KEY_ENV: &str = "MENTOR_API_KEY";

/// Fallback environment variable for an OpenRouter key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Fallback environment variable for an OpenAI key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the API base URL.
pub const API_BASE_ENV: &str = "MENTOR_API_BASE";

/// Environment variable overriding the model.
pub const MODEL_ENV: &str = "MENTOR_MODEL";

/// Environment variable for the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "MENTOR_TIMEOUT_SECS";

/// Environment variable for the retry budget.
pub const MAX_RETRIES_ENV: &str = "MENTOR_MAX_RETRIES";

/// Upper bound on the retry budget.
pub const MAX_RETRIES_LIMIT: u32 = 5;

/// Default model for both diagnosis and feedback.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Completion API provider. Both speak the OpenAI chat format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenRouter API (model ids are vendor-qualified).
    #[default]
    OpenRouter,
    /// OpenAI API or any compatible endpoint.
    OpenAI,
}

impl Provider {
    /// Default base URL for this provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => OPENROUTER_API_BASE,
            Self::OpenAI => OPENAI_API_BASE,
        }
    }

    /// Qualify a bare model name the way this provider expects.
    pub fn qualify_model(&self, model: &str) -> String {
        match self {
            Self::OpenRouter if !model.contains('/') => format!("openai/{}", model),
            _ => model.to_string(),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenRouter => write!(f, "openrouter"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Model parameters for a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier (e.g., "gpt-4o-mini", "openai/gpt-4o-mini").
    pub model: String,

    /// Maximum tokens to generate in responses.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for response generation (0.0 to 2.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl ModelConfig {
    /// Create a new model configuration with the given model ID.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}

/// Connection settings for the completion service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Extra attempts after the first for retryable failures.
    pub max_retries: u32,
}

impl ClientConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            base_url: provider.default_base_url().to_string(),
            provider,
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }

    /// Read connection settings from the environment.
    ///
    /// The key comes from `MENTOR_API_KEY` (OpenAI-compatible endpoint),
    /// then `OPENROUTER_API_KEY`, then `OPENAI_API_KEY`. `MENTOR_API_BASE`,
    /// `MENTOR_TIMEOUT_SECS` and `MENTOR_MAX_RETRIES` override the defaults.
    pub fn from_env() -> Result<Self> {
        let (provider, api_key) = if let Ok(key) = std::env::var(API_KEY_ENV) {
            (Provider::OpenAI, key)
        } else if let Ok(key) = std::env::var(OPENROUTER_API_KEY_ENV) {
            (Provider::OpenRouter, key)
        } else if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
            (Provider::OpenAI, key)
        } else {
            return Err(AgentError::Configuration(format!(
                "Missing {} environment variable",
                API_KEY_ENV
            )));
        };

        let mut config = Self::new(provider, api_key);
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            // A custom endpoint takes bare OpenAI model names
            config.provider = Provider::OpenAI;
            config.base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_env::<u64>(TIMEOUT_ENV)? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env::<u32>(MAX_RETRIES_ENV)? {
            config = config.with_max_retries(retries);
        }
        Ok(config)
    }

    /// Set the retry budget, capped at [`MAX_RETRIES_LIMIT`].
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_RETRIES_LIMIT);
        self
    }

    /// Chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Model configuration for this provider, honoring `MENTOR_MODEL`.
    pub fn model_config(&self, model_override: Option<&str>) -> ModelConfig {
        let model = model_override
            .map(str::to_string)
            .or_else(|| std::env::var(MODEL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        ModelConfig::new(self.provider.qualify_model(&model))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AgentError::Configuration(format!("{} is not a valid number: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 2048);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_model_config_deserialize_defaults() {
        let config: ModelConfig = serde_json::from_str(r#"{"model": "gpt-4o"}"#).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_max_retries_capped() {
        let config = ClientConfig::new(Provider::OpenAI, "key").with_max_retries(40);
        assert_eq!(config.max_retries, MAX_RETRIES_LIMIT);

        let config = ClientConfig::new(Provider::OpenAI, "key").with_max_retries(1);
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_temperature_clamped() {
        let config = ModelConfig::new("m").with_temperature(5.0);
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn test_qualify_model() {
        assert_eq!(Provider::OpenRouter.qualify_model("gpt-4o-mini"), "openai/gpt-4o-mini");
        assert_eq!(
            Provider::OpenRouter.qualify_model("anthropic/claude-3-haiku"),
            "anthropic/claude-3-haiku"
        );
        assert_eq!(Provider::OpenAI.qualify_model("gpt-4o-mini"), "gpt-4o-mini");
    }

    #[test]
    fn test_client_config_urls() {
        let config = ClientConfig::new(Provider::OpenAI, "key");
        assert_eq!(config.completions_url(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(config.model_config(Some("gpt-4o")).model, "gpt-4o");
    }
}
