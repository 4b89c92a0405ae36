//! Music service abstraction used by the chat operations

use async_trait::async_trait;

use crate::error::SpotifyResult;
use crate::models::{Artist, PlaybackState, Playlist, Track, UserProfile};

/// Largest page the top-items endpoints accept
pub const MAX_PAGE_SIZE: u32 = 50;

/// Catalog, playback and library calls made on behalf of the user
///
/// [`SpotifyClient`](crate::SpotifyClient) implements this over the Web API;
/// tests substitute an in-memory implementation.
#[async_trait]
pub trait MusicService: Send + Sync {
    /// Best match for a free-text track query
    async fn search_track(&self, query: &str) -> SpotifyResult<Option<Track>>;

    /// Append a track URI to the playback queue
    async fn enqueue(&self, uri: &str) -> SpotifyResult<()>;

    async fn skip_next(&self) -> SpotifyResult<()>;

    async fn skip_previous(&self) -> SpotifyResult<()>;

    async fn pause(&self) -> SpotifyResult<()>;

    async fn resume(&self) -> SpotifyResult<()>;

    /// `None` when nothing is loaded on any device
    async fn current_playback(&self) -> SpotifyResult<Option<PlaybackState>>;

    /// Create an empty playlist owned by the current user
    async fn create_playlist(&self, name: &str) -> SpotifyResult<Playlist>;

    /// Append track URIs to a playlist, preserving order
    async fn add_items_to_playlist(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<()>;

    /// One page of all-time top tracks; `limit` must be within `1..=MAX_PAGE_SIZE`
    async fn top_tracks_page(&self, limit: u32, offset: u32) -> SpotifyResult<Vec<Track>>;

    /// One page of all-time top artists; `limit` must be within `1..=MAX_PAGE_SIZE`
    async fn top_artists_page(&self, limit: u32, offset: u32) -> SpotifyResult<Vec<Artist>>;

    async fn has_active_device(&self) -> SpotifyResult<bool>;

    async fn profile(&self) -> SpotifyResult<UserProfile>;
}
