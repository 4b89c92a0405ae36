//! Spotify Web API client for Cadence
//!
//! This crate provides a client for the Spotify Web API, enabling:
//! - Track search and queueing
//! - Playback control (skip, pause, resume, current state)
//! - Playlist creation
//! - All-time top tracks and artists
//!
//! Requests authenticate with a long-lived refresh token obtained through the
//! authorization-code flow ([`SpotifyClient::authorize_url`] and
//! [`SpotifyClient::exchange_code`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_shared_config::SpotifyConfig;
//! use cadence_spotify_client::{MusicService, SpotifyClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SpotifyClient::new(&SpotifyConfig::from_env()?)?;
//!
//! if let Some(track) = client.search_track("Hey Jude").await? {
//!     client.enqueue(&track.uri).await?;
//!     println!("Queued {}", track.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variables
//!
//! - `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`: application credentials (required)
//! - `SPOTIFY_REFRESH_TOKEN`: user refresh token (required for API calls)

mod client;
mod error;
mod models;
mod service;

pub use client::SpotifyClient;
pub use error::{SpotifyError, SpotifyResult};
pub use models::{Artist, Device, PlaybackState, Playlist, TokenGrant, Track, UserProfile};
pub use service::{MusicService, MAX_PAGE_SIZE};
