//! Spotify Web API error types

use thiserror::Error;

/// Spotify API client errors
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// No refresh token is configured
    #[error("Spotify refresh token is missing; run `cadence authorize` first")]
    MissingCredentials,

    /// Invalid input provided to API method
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse Spotify response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A configured base URL could not be parsed
    #[error("Invalid Spotify URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The accounts service refused to issue a token
    #[error("Spotify authorization failed: {0}")]
    Auth(String),

    /// Spotify API returned an error
    #[error("Spotify API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        reason: Option<String>,
    },

    /// Playback commands need an active device
    #[error("No active Spotify device")]
    NoActiveDevice,

    /// Access token rejected
    #[error("Spotify rejected the access token")]
    Unauthorized,

    /// Rate limited by Spotify
    #[error("Rate limited by Spotify API")]
    RateLimited,

    /// Request timeout
    #[error("Request to Spotify timed out")]
    Timeout,
}

/// Result type for Spotify operations
pub type SpotifyResult<T> = Result<T, SpotifyError>;
