//! Shared helpers for the CLI integration tests

#![allow(unused_imports)]
#![allow(dead_code)]

use std::sync::Arc;

use cadence_cli::services::{ChatSession, StreamEvent, STREAM_CHANNEL_CAPACITY};
use cadence_cli::ChatResult;
use cadence_llm_client::LlmClient;
use cadence_shared_config::{ChatConfig, LlmConfig, SynthesisPolicy};
use cadence_spotify_client::MusicService;
use cadence_test_utils::MockLlmServer;
use tokio::sync::mpsc;

pub use cadence_test_utils::{
    sse_body, text_chunk, tool_call_chunks, FakeMusicService, MockSpotifyServer, MusicCall,
    ToolCallFixture, TrackFixture,
};

/// Completions client pointed at the mock server
pub fn llm_client(server: &MockLlmServer) -> LlmClient {
    LlmClient::new(&LlmConfig::with_url(server.url())).expect("client should build")
}

/// Session over `music` using `policy`
pub fn session(
    server: &MockLlmServer,
    music: Arc<dyn MusicService>,
    policy: SynthesisPolicy,
) -> ChatSession {
    ChatSession::new(
        llm_client(server),
        music,
        ChatConfig {
            synthesis_policy: policy,
            ..ChatConfig::default()
        },
    )
}

/// Run one turn, collecting every event it emitted
pub async fn run_turn(
    session: &mut ChatSession,
    input: &str,
) -> (ChatResult<String>, Vec<StreamEvent>) {
    let (tx, mut rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

    let turn = async {
        let tx = tx;
        session.process_turn(input, &tx).await
    };
    let collect = async {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    };

    tokio::join!(turn, collect)
}

/// Concatenated token text of `events`
pub fn streamed_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Token(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

pub fn hey_jude() -> TrackFixture {
    TrackFixture::new("1", "Hey Jude", "The Beatles")
}

pub fn yellow() -> TrackFixture {
    TrackFixture::new("2", "Yellow", "Coldplay")
}
