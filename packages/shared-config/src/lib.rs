//! Shared configuration types for Cadence
//!
//! All configuration is read from environment variables (optionally seeded
//! from a `.env` file by the binary) so the chat client, the test suites and
//! the `authorize` helper agree on names and defaults.

mod chat;
mod error;
mod llm;
mod spotify;

pub use chat::{ChatConfig, SynthesisPolicy};
pub use error::{ConfigError, ConfigResult};
pub use llm::LlmConfig;
pub use spotify::{SpotifyConfig, SPOTIFY_SCOPES};

use std::env;

/// Complete configuration for one chat session
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Chat-completions provider configuration
    pub llm: LlmConfig,

    /// Spotify Web API configuration
    pub spotify: SpotifyConfig,

    /// Turn processing configuration
    pub chat: ChatConfig,

    /// Environment mode (development, staging, production)
    pub environment: Environment,
}

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        })
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Seed the process environment from `.env` in the working directory, if present
///
/// Variables already set in the environment take precedence.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

impl AppConfig {
    /// Load the full configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            llm: LlmConfig::from_env()?,
            spotify: SpotifyConfig::from_env()?,
            chat: ChatConfig::from_env()?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse()
                .unwrap_or_default(),
        })
    }
}

/// Helper function to get a required environment variable
///
/// Empty values are treated the same as missing ones.
pub fn get_required_env(name: &str) -> ConfigResult<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

/// Helper function to get an optional environment variable with a default
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Helper function to parse an environment variable into a specific type
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

/// Validate that a configured base URL uses an http(s) scheme
pub(crate) fn validate_base_url(name: &str, url: &str) -> ConfigResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl(
            name.to_string(),
            format!("'{}' must start with http:// or https://", url),
        ))
    }
}
