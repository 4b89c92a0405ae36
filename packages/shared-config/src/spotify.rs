//! Spotify Web API configuration types

use std::fmt;

use crate::{get_env_or_default, get_required_env, parse_env, validate_base_url, ConfigResult};

/// Default Web API base URL
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Default accounts service base URL (authorization and token exchange)
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Default redirect URI registered for the application
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

/// OAuth scopes needed by the chat operations
pub const SPOTIFY_SCOPES: &[&str] = &[
    "user-library-read",
    "user-read-recently-played",
    "user-read-playback-state",
    "user-modify-playback-state",
    "playlist-modify-public",
    "playlist-modify-private",
    "user-top-read",
];

/// Spotify application credentials and endpoints
#[derive(Clone)]
pub struct SpotifyConfig {
    /// Application client ID
    pub client_id: String,

    /// Application client secret
    pub client_secret: String,

    /// Redirect URI registered in the Spotify developer dashboard
    pub redirect_uri: String,

    /// Long-lived refresh token obtained through `cadence authorize`
    pub refresh_token: Option<String>,

    /// Web API base URL
    pub api_url: String,

    /// Accounts service base URL
    pub accounts_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_url", &self.api_url)
            .field("accounts_url", &self.accounts_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SpotifyConfig {
    /// Load Spotify configuration from environment variables
    ///
    /// Client ID and secret are required. The refresh token is optional here
    /// because `cadence authorize` runs before one exists.
    pub fn from_env() -> ConfigResult<Self> {
        let client_id = get_required_env("SPOTIFY_CLIENT_ID")?;
        let client_secret = get_required_env("SPOTIFY_CLIENT_SECRET")?;

        let api_url = get_env_or_default("SPOTIFY_API_URL", DEFAULT_API_URL);
        validate_base_url("SPOTIFY_API_URL", &api_url)?;

        let accounts_url = get_env_or_default("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL);
        validate_base_url("SPOTIFY_ACCOUNTS_URL", &accounts_url)?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: get_env_or_default("SPOTIFY_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            refresh_token: get_required_env("SPOTIFY_REFRESH_TOKEN").ok(),
            api_url,
            accounts_url,
            timeout_secs: parse_env("SPOTIFY_TIMEOUT", 15)?,
        })
    }

    /// Create a configuration pointing both services at one base URL (useful for testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            refresh_token: Some("test-refresh-token".to_string()),
            api_url: format!("{}/v1", url.trim_end_matches('/')),
            accounts_url: url,
            timeout_secs: 15,
        }
    }

    /// Get the full URL for a Web API path
    pub fn api_endpoint(&self, path: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Get the full URL of the token endpoint
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url.trim_end_matches('/'))
    }

    /// Get the full URL of the authorization page
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url.trim_end_matches('/'))
    }

    /// Space-separated scope string for the authorization request
    pub fn scope_string() -> String {
        SPOTIFY_SCOPES.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;

    #[test]
    fn test_with_url_endpoints() {
        let config = SpotifyConfig::with_url("http://127.0.0.1:9000/");
        assert_eq!(config.api_endpoint("me"), "http://127.0.0.1:9000/v1/me");
        assert_eq!(
            config.api_endpoint("/me/player"),
            "http://127.0.0.1:9000/v1/me/player"
        );
        assert_eq!(config.token_url(), "http://127.0.0.1:9000/api/token");
    }

    #[test]
    fn test_scope_string_contains_playback_scopes() {
        let scopes = SpotifyConfig::scope_string();
        assert!(scopes.contains("user-modify-playback-state"));
        assert!(scopes.contains("user-top-read"));
        assert_eq!(scopes.split(' ').count(), SPOTIFY_SCOPES.len());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = SpotifyConfig::with_url("http://localhost");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("test-secret"));
        assert!(!debug_str.contains("test-refresh-token"));
    }

    #[test]
    fn test_from_env_requires_client_credentials() {
        temp_env::with_vars(
            [
                ("SPOTIFY_CLIENT_ID", Some("id")),
                ("SPOTIFY_CLIENT_SECRET", None::<&str>),
            ],
            || {
                let result = SpotifyConfig::from_env();
                assert!(
                    matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "SPOTIFY_CLIENT_SECRET")
                );
            },
        );
    }

    #[test]
    fn test_from_env_refresh_token_optional() {
        temp_env::with_vars(
            [
                ("SPOTIFY_CLIENT_ID", Some("id")),
                ("SPOTIFY_CLIENT_SECRET", Some("secret")),
                ("SPOTIFY_REFRESH_TOKEN", None),
            ],
            || {
                let config = SpotifyConfig::from_env().unwrap();
                assert!(config.refresh_token.is_none());
                assert_eq!(config.redirect_uri, "http://127.0.0.1:8888/callback");
            },
        );
    }
}
