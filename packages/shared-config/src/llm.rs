//! Chat-completions provider configuration types

use std::fmt;

use crate::{get_env_or_default, parse_env, validate_base_url, ConfigError, ConfigResult};

/// Default OpenAI-compatible API base URL
const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Default chat model
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for an OpenAI-compatible chat-completions endpoint
#[derive(Clone)]
pub struct LlmConfig {
    /// API base URL, e.g. `https://api.openai.com/v1`
    pub api_url: String,

    /// Bearer token sent with every request
    pub api_key: String,

    /// Model used for both the tool-calling pass and the narration pass
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum tokens for generation
    pub max_tokens: u32,

    /// Temperature for generation (0.0 - 2.0)
    pub temperature: f32,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl LlmConfig {
    /// Load LLM configuration from environment variables
    ///
    /// `LLM_API_KEY` is required; `OPENAI_API_KEY` is accepted as a fallback.
    pub fn from_env() -> ConfigResult<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("LLM_API_KEY".to_string()))?;

        let api_url = get_env_or_default("LLM_API_URL", DEFAULT_API_URL);
        validate_base_url("LLM_API_URL", &api_url)?;

        let temperature: f32 = parse_env("LLM_TEMPERATURE", 0.7)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue(
                "LLM_TEMPERATURE".to_string(),
                format!("{} is outside 0.0..=2.0", temperature),
            ));
        }

        Ok(Self {
            api_url,
            api_key,
            model: get_env_or_default("LLM_MODEL", DEFAULT_MODEL),
            timeout_secs: parse_env("LLM_TIMEOUT", 60)?,
            max_tokens: parse_env("LLM_MAX_TOKENS", 1024)?,
            temperature,
        })
    }

    /// Create a configuration with a custom URL (useful for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            api_url: url.into(),
            ..Self::default()
        }
    }

    /// Get the full URL for the chat completions endpoint
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}
