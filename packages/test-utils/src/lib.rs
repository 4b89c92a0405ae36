//! Shared test utilities for the Cadence workspace
//!
//! This crate provides mock implementations of external services for testing
//! without network dependencies. These mocks are used by the client crates'
//! and the CLI's test suites.
//!
//! # Mock Services
//!
//! - [`MockLlmServer`] - Mock chat-completions server streaming SSE replies
//! - [`MockSpotifyServer`] - Mock Spotify accounts service and Web API
//! - [`FakeMusicService`] - Recording in-memory `MusicService`
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_test_utils::{FakeMusicService, MockLlmServer, ToolCallFixture, TrackFixture};
//!
//! #[tokio::test]
//! async fn test_with_mocks() {
//!     let llm = MockLlmServer::start().await;
//!     llm.mock_tool_calls(&[ToolCallFixture::new("switch_to_next_track", json!({}))]).await;
//!
//!     let music = FakeMusicService::new()
//!         .with_tracks(&[TrackFixture::new("1", "Hey Jude", "The Beatles")]);
//!
//!     // Use llm.url() to configure the completions client
//! }
//! ```

mod fake;
mod llm;
mod spotify;

pub use fake::{FakeMusicService, MusicCall};
pub use llm::{sse_body, text_chunk, tool_call_chunks, MockLlmServer, ToolCallFixture};
pub use spotify::{MockSpotifyServer, TrackFixture};
