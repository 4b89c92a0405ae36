//! Error types for turn processing
//!
//! Two levels of failure exist. A [`ToolError`] belongs to a single operation
//! call: it is rendered as text and reported alongside its siblings, it never
//! ends a turn. A [`ChatError`] ends the current turn; the REPL reports it
//! and waits for the next input.

use cadence_llm_client::LlmError;
use cadence_spotify_client::SpotifyError;
use thiserror::Error;

/// Message shown when Spotify has nowhere to play
pub const NO_ACTIVE_DEVICE_MESSAGE: &str =
    "You don't have any active devices. Please open Spotify on your device and restart.";

/// Failure of one dispatched operation
///
/// The `Display` text is user-facing: it is what the direct synthesis shows
/// and what the narration prompt receives as the call's details.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Arguments were not a JSON object, missed a required key or had the wrong type
    #[error("Couldn't run {operation}: {reason}")]
    MalformedArguments { operation: String, reason: String },

    /// The model named an operation that does not exist
    #[error("I don't know how to do '{0}'")]
    UnknownOperation(String),

    #[error("{}", NO_ACTIVE_DEVICE_MESSAGE)]
    NoActiveDevice,

    /// A search came back empty
    #[error("Couldn't find anything for '{0}'")]
    NotFound(String),

    /// Spotify failed or could not be reached
    #[error("Spotify is unavailable right now ({0})")]
    UpstreamUnavailable(String),
}

impl ToolError {
    pub fn malformed(operation: &str, reason: impl Into<String>) -> Self {
        Self::MalformedArguments {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<SpotifyError> for ToolError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::NoActiveDevice => ToolError::NoActiveDevice,
            other => ToolError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Failure that ends a turn
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
