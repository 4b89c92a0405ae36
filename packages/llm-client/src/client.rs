//! Chat completions HTTP client with connection pooling

use std::pin::Pin;
use std::time::Duration;

use cadence_shared_config::LlmConfig;
use futures_util::Stream;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::models::{ChatCompletionRequest, ChatMessage, ChatStreamChunk, ToolDefinition};
use crate::sse::CompletionStream;

/// Maximum error body size to prevent memory exhaustion
const MAX_ERROR_BODY_SIZE: usize = 1000;

/// Stream of parsed completion chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = LlmResult<ChatStreamChunk>> + Send>>;

/// OpenAI-compatible chat completions client
#[derive(Debug, Clone)]
pub struct LlmClient {
    /// HTTP client with connection pool
    http_client: Client,
    /// Configuration
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client from configuration
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(LlmError::HttpError)?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    /// Create a client with custom HTTP client (for testing)
    pub fn with_client(config: &LlmConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config: config.clone(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Truncate error body to prevent memory exhaustion
    /// Safely handles UTF-8 boundaries to avoid panics on multi-byte characters
    fn truncate_error_body(body: String) -> String {
        if body.len() <= MAX_ERROR_BODY_SIZE {
            return body;
        }

        let truncate_at = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
            .last()
            .unwrap_or(0);

        format!("{}... (truncated)", &body[..truncate_at])
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::ConnectionRefused(self.config.api_url.clone())
        } else if e.is_timeout() {
            LlmError::Timeout(self.config.timeout_secs)
        } else {
            LlmError::HttpError(e)
        }
    }

    /// Start a streamed completion
    ///
    /// `tools` is sent as the function-calling schema list when present; the
    /// narration pass calls this without tools. The returned stream ends after
    /// the provider's `[DONE]` event and yields
    /// [`LlmError::StreamInterrupted`] if the connection closes before it.
    pub async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> LlmResult<ChatStream> {
        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "Starting streaming chat completion"
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            tools: tools.filter(|t| !t.is_empty()),
            stream: true,
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        };

        let response = self
            .http_client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::truncate_error_body(response.text().await.unwrap_or_default());

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(LlmError::Unauthorized(status.as_u16()));
            }

            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!("Streaming chat completion started");

        Ok(Box::pin(CompletionStream::new(response.bytes_stream())))
    }
}
