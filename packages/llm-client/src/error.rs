//! Error types for the chat completions client

use thiserror::Error;

/// Errors that can occur when talking to the completions endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The provider answered with a non-success status
    #[error("LLM API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// API key rejected
    #[error("LLM API rejected the credentials (status {0})")]
    Unauthorized(u16),

    /// Request timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection refused (provider not reachable)
    #[error("Connection refused. Is the LLM endpoint reachable at {0}?")]
    ConnectionRefused(String),

    /// An error event was delivered inside the stream
    #[error("LLM stream error: {0}")]
    StreamError(String),

    /// The stream ended before the `[DONE]` terminator
    #[error("LLM stream ended before the response completed")]
    StreamInterrupted,
}

/// Result type for completions operations
pub type LlmResult<T> = Result<T, LlmError>;
