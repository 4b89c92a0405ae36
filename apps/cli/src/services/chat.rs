//! Chat session: one transcript, one turn at a time
//!
//! A turn streams the transcript to the model together with the operation
//! schemas, forwards text to the renderer as it arrives, reassembles any tool
//! calls, dispatches them, and appends exactly one assistant message.

use std::sync::Arc;

use cadence_llm_client::{ChatMessage, LlmClient};
use cadence_shared_config::ChatConfig;
use cadence_spotify_client::MusicService;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::accumulator::StreamAccumulator;
use super::dispatch::Dispatcher;
use super::synthesis;
use crate::error::{ChatError, ChatResult};
use crate::tools::tool_definitions;

/// Assistant message every transcript starts with
pub const GREETING: &str = "How can I help you?";

/// Channel buffer size for streaming events
pub const STREAM_CHANNEL_CAPACITY: usize = 100;

/// Reply used when the model produced neither text nor operations
pub const EMPTY_REPLY: &str = "Sorry, I didn't get a response for that. Could you try rephrasing?";

const SYSTEM_PROMPT: &str = "You are a chatbot that controls the user's Spotify account. \
    Use the provided functions whenever the user asks to play, pause, resume or skip music, \
    manage the queue, create playlists, or look at their listening history. \
    Otherwise answer briefly and conversationally.";

/// Events emitted while a turn is processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text to show immediately
    Token(String),

    /// An operation is about to run
    ToolCallStart { index: u32, name: String },

    /// An operation finished
    ToolCallComplete { index: u32, name: String, ok: bool },

    /// The narration shown so far is abandoned; a replacement follows
    Discard,

    /// The turn finished with this assistant message
    Complete { message: String },
}

/// In-memory conversation with the model
pub struct ChatSession {
    llm: LlmClient,
    dispatcher: Dispatcher,
    config: ChatConfig,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(llm: LlmClient, music: Arc<dyn MusicService>, config: ChatConfig) -> Self {
        Self {
            llm,
            dispatcher: Dispatcher::new(music),
            config,
            transcript: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Reset the transcript to the greeting
    pub fn clear(&mut self) {
        self.transcript = vec![ChatMessage::assistant(GREETING)];
    }

    fn validate_input(&self, input: &str) -> ChatResult<String> {
        let max = self.config.max_message_length;
        let message = input.trim();

        if message.is_empty() {
            return Err(ChatError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }

        let length = message.chars().count();
        if length > max {
            return Err(ChatError::InvalidInput(format!(
                "Message too long: {} characters (max {})",
                length, max
            )));
        }

        Ok(message.to_string())
    }

    /// Process one user message, streaming events through `tx`
    ///
    /// Returns the assistant message appended to the transcript. If the
    /// completion stream fails, the user message stays in the transcript, no
    /// assistant message is appended, and the error is returned.
    #[instrument(skip(self, input, tx), fields(transcript_len = self.transcript.len()))]
    pub async fn process_turn(
        &mut self,
        input: &str,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> ChatResult<String> {
        let message = self.validate_input(input)?;
        self.transcript.push(ChatMessage::user(message));

        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(self.transcript.iter().cloned());

        let mut stream = self
            .llm
            .chat_stream(messages, Some(tool_definitions()))
            .await?;

        let mut accumulator = StreamAccumulator::new();
        while let Some(chunk) = stream.next().await {
            for delta in chunk?.deltas() {
                if let Some(text) = accumulator.push(delta) {
                    let _ = tx.send(StreamEvent::Token(text)).await;
                }
            }
        }

        let (text, calls) = accumulator.finish();

        let reply = if calls.is_empty() {
            if text.trim().is_empty() {
                warn!("Model returned neither text nor operations");
                let _ = tx.send(StreamEvent::Token(EMPTY_REPLY.to_string())).await;
                EMPTY_REPLY.to_string()
            } else {
                text
            }
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                let _ = tx
                    .send(StreamEvent::ToolCallStart {
                        index: call.index,
                        name: call.name.clone(),
                    })
                    .await;

                let result = self.dispatcher.dispatch_one(call).await;

                let _ = tx
                    .send(StreamEvent::ToolCallComplete {
                        index: result.index,
                        name: result.operation_name.clone(),
                        ok: result.is_ok(),
                    })
                    .await;
                results.push(result);
            }

            let preamble = text.trim_end();
            if !preamble.is_empty() {
                let _ = tx.send(StreamEvent::Token("\n\n".to_string())).await;
            }

            let synthesized =
                synthesis::synthesize(&self.llm, self.config.synthesis_policy, &results, tx).await;

            if preamble.is_empty() {
                synthesized
            } else {
                format!("{}\n\n{}", preamble, synthesized)
            }
        };

        debug!(reply_len = reply.len(), "Turn complete");
        info!(
            transcript_len = self.transcript.len() + 1,
            "Assistant reply appended"
        );

        self.transcript.push(ChatMessage::assistant(reply.clone()));
        let _ = tx
            .send(StreamEvent::Complete {
                message: reply.clone(),
            })
            .await;

        Ok(reply)
    }
}
