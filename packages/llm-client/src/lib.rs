//! OpenAI-compatible chat completions client for Cadence
//!
//! This crate talks to any endpoint implementing `POST /chat/completions`
//! (OpenAI, Ollama's `/v1` compatibility layer, vLLM, ...). It supports
//! function-calling tool schemas and server-sent-event streaming, exposing
//! each streamed chunk as a sequence of [`StreamDelta`] values: text deltas
//! and index-tagged tool-call fragments.
//!
//! # Thread Safety
//!
//! `LlmClient` is `Clone + Send + Sync`; clones share one HTTP connection pool.
//!
//! # Example
//!
//! ```no_run
//! use cadence_llm_client::{ChatMessage, LlmClient, StreamDelta};
//! use cadence_shared_config::LlmConfig;
//! use futures_util::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LlmClient::new(&LlmConfig::from_env()?)?;
//!
//! let messages = vec![
//!     ChatMessage::system("You are a helpful assistant."),
//!     ChatMessage::user("Hello!"),
//! ];
//! let mut stream = client.chat_stream(messages, None).await?;
//! while let Some(chunk) = stream.next().await {
//!     for delta in chunk?.deltas() {
//!         if let StreamDelta::Text(text) = delta {
//!             print!("{}", text);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod models;
mod sse;

pub use client::{ChatStream, LlmClient};
pub use error::{LlmError, LlmResult};
pub use models::{
    ChatCompletionRequest, ChatMessage, ChatRole, ChatStreamChunk, FunctionDefinition,
    StreamChoice, StreamDelta, ToolDefinition,
};
