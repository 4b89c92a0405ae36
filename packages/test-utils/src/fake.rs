//! In-memory music service for testing the dispatch loop
//!
//! [`FakeMusicService`] implements [`MusicService`] over a small catalog and
//! records every call, so tests can assert on call counts and ordering.
//!
//! # Lock Poisoning Recovery
//!
//! Locks are taken with `unwrap_or_else(|e| e.into_inner())` so one panicking
//! test does not cascade into the next.

use std::sync::Mutex;

use async_trait::async_trait;
use cadence_spotify_client::{
    Artist, MusicService, PlaybackState, Playlist, SpotifyError, SpotifyResult, Track,
    UserProfile, MAX_PAGE_SIZE,
};

use crate::spotify::TrackFixture;

/// A call received by the fake, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicCall {
    Search(String),
    Enqueue(String),
    SkipNext,
    SkipPrevious,
    Pause,
    Resume,
    CurrentPlayback,
    CreatePlaylist(String),
    AddItems { playlist_id: String, uris: Vec<String> },
    TopTracks { limit: u32, offset: u32 },
    TopArtists { limit: u32, offset: u32 },
    HasActiveDevice,
    Profile,
}

#[derive(Debug, Default)]
struct FakeState {
    catalog: Vec<Track>,
    top_tracks: Vec<Track>,
    top_artists: Vec<Artist>,
    queue: Vec<Track>,
    now_playing: Option<Track>,
    is_playing: bool,
    active_device: bool,
    rejected_uris: Vec<String>,
    playlists: Vec<(Playlist, Vec<String>)>,
}

/// Recording in-memory [`MusicService`]
///
/// # Example
///
/// ```rust
/// use cadence_test_utils::{FakeMusicService, MusicCall, TrackFixture};
/// use cadence_spotify_client::MusicService;
///
/// # tokio_test::block_on(async {
/// let music = FakeMusicService::new()
///     .with_tracks(&[TrackFixture::new("1", "Hey Jude", "The Beatles")]);
///
/// let track = music.search_track("hey jude").await.unwrap().unwrap();
/// music.enqueue(&track.uri).await.unwrap();
///
/// assert_eq!(music.count(|c| matches!(c, MusicCall::Enqueue(_))), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct FakeMusicService {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<MusicCall>>,
}

impl Default for FakeMusicService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMusicService {
    /// Empty catalog, nothing playing, one active device
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                active_device: true,
                ..FakeState::default()
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Add searchable tracks
    pub fn with_tracks(self, tracks: &[TrackFixture]) -> Self {
        self.lock_state()
            .catalog
            .extend(tracks.iter().map(TrackFixture::to_track));
        self
    }

    /// Generate `count` ranked top tracks named `Top Track {rank}`
    pub fn with_top_tracks(self, count: usize) -> Self {
        self.lock_state().top_tracks = (1..=count)
            .map(|rank| {
                TrackFixture::new(
                    &format!("top-{}", rank),
                    &format!("Top Track {}", rank),
                    &format!("Artist {}", rank),
                )
                .to_track()
            })
            .collect();
        self
    }

    /// Generate `count` ranked top artists named `Top Artist {rank}`
    pub fn with_top_artists(self, count: usize) -> Self {
        self.lock_state().top_artists = (1..=count)
            .map(|rank| Artist {
                id: Some(format!("artist-{}", rank)),
                name: format!("Top Artist {}", rank),
            })
            .collect();
        self
    }

    /// Start with `track` loaded and playing
    pub fn playing(self, track: &TrackFixture) -> Self {
        {
            let mut state = self.lock_state();
            state.now_playing = Some(track.to_track());
            state.is_playing = true;
        }
        self
    }

    /// Start with `track` loaded but paused
    pub fn paused(self, track: &TrackFixture) -> Self {
        {
            let mut state = self.lock_state();
            state.now_playing = Some(track.to_track());
            state.is_playing = false;
        }
        self
    }

    /// Simulate a closed Spotify app: player commands fail with `NoActiveDevice`
    pub fn without_active_device(self) -> Self {
        self.lock_state().active_device = false;
        self
    }

    /// Make `enqueue` fail with a 502 for `track`
    pub fn rejecting_enqueue(self, track: &TrackFixture) -> Self {
        self.lock_state().rejected_uris.push(track.to_track().uri);
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<MusicCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&MusicCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    /// Track URIs currently queued
    pub fn queued_uris(&self) -> Vec<String> {
        self.lock_state().queue.iter().map(|t| t.uri.clone()).collect()
    }

    /// Items of the playlist with `playlist_id`
    pub fn playlist_items(&self, playlist_id: &str) -> Option<Vec<String>> {
        self.lock_state()
            .playlists
            .iter()
            .find(|(p, _)| p.id == playlist_id)
            .map(|(_, items)| items.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.lock_state().is_playing
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: MusicCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn require_device(&self) -> SpotifyResult<()> {
        if self.lock_state().active_device {
            Ok(())
        } else {
            Err(SpotifyError::NoActiveDevice)
        }
    }

    fn check_page(limit: u32) -> SpotifyResult<()> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(SpotifyError::InvalidInput(format!(
                "page limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    fn page<T: Clone>(items: &[T], limit: u32, offset: u32) -> Vec<T> {
        items
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MusicService for FakeMusicService {
    async fn search_track(&self, query: &str) -> SpotifyResult<Option<Track>> {
        self.record(MusicCall::Search(query.to_string()));
        let query = query.to_lowercase();

        Ok(self
            .lock_state()
            .catalog
            .iter()
            .find(|t| query.contains(&t.name.to_lowercase()))
            .cloned())
    }

    async fn enqueue(&self, uri: &str) -> SpotifyResult<()> {
        self.record(MusicCall::Enqueue(uri.to_string()));
        self.require_device()?;

        let mut state = self.lock_state();
        if state.rejected_uris.iter().any(|u| u == uri) {
            return Err(SpotifyError::Api {
                status: 502,
                message: "Bad gateway".to_string(),
                reason: None,
            });
        }
        let track = state
            .catalog
            .iter()
            .find(|t| t.uri == uri)
            .cloned()
            .ok_or_else(|| SpotifyError::Api {
                status: 400,
                message: format!("Invalid track uri: {}", uri),
                reason: None,
            })?;
        state.queue.push(track);
        Ok(())
    }

    async fn skip_next(&self) -> SpotifyResult<()> {
        self.record(MusicCall::SkipNext);
        self.require_device()?;

        let mut state = self.lock_state();
        if !state.queue.is_empty() {
            let next = state.queue.remove(0);
            state.now_playing = Some(next);
        }
        state.is_playing = state.now_playing.is_some();
        Ok(())
    }

    async fn skip_previous(&self) -> SpotifyResult<()> {
        self.record(MusicCall::SkipPrevious);
        self.require_device()
    }

    async fn pause(&self) -> SpotifyResult<()> {
        self.record(MusicCall::Pause);
        self.require_device()?;
        self.lock_state().is_playing = false;
        Ok(())
    }

    async fn resume(&self) -> SpotifyResult<()> {
        self.record(MusicCall::Resume);
        self.require_device()?;
        self.lock_state().is_playing = true;
        Ok(())
    }

    async fn current_playback(&self) -> SpotifyResult<Option<PlaybackState>> {
        self.record(MusicCall::CurrentPlayback);
        let state = self.lock_state();

        Ok(state.now_playing.as_ref().map(|track| PlaybackState {
            is_playing: state.is_playing,
            item: Some(track.clone()),
            device: None,
        }))
    }

    async fn create_playlist(&self, name: &str) -> SpotifyResult<Playlist> {
        self.record(MusicCall::CreatePlaylist(name.to_string()));

        let mut state = self.lock_state();
        let id = format!("playlist-{}", state.playlists.len() + 1);
        let playlist = Playlist {
            id: id.clone(),
            name: name.to_string(),
            url: Some(format!("https://open.spotify.com/playlist/{}", id)),
        };
        state.playlists.push((playlist.clone(), Vec::new()));
        Ok(playlist)
    }

    async fn add_items_to_playlist(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<()> {
        self.record(MusicCall::AddItems {
            playlist_id: playlist_id.to_string(),
            uris: uris.to_vec(),
        });

        let mut state = self.lock_state();
        let (_, items) = state
            .playlists
            .iter_mut()
            .find(|(p, _)| p.id == playlist_id)
            .ok_or_else(|| SpotifyError::Api {
                status: 404,
                message: "Not found.".to_string(),
                reason: None,
            })?;
        items.extend_from_slice(uris);
        Ok(())
    }

    async fn top_tracks_page(&self, limit: u32, offset: u32) -> SpotifyResult<Vec<Track>> {
        self.record(MusicCall::TopTracks { limit, offset });
        Self::check_page(limit)?;
        Ok(Self::page(&self.lock_state().top_tracks, limit, offset))
    }

    async fn top_artists_page(&self, limit: u32, offset: u32) -> SpotifyResult<Vec<Artist>> {
        self.record(MusicCall::TopArtists { limit, offset });
        Self::check_page(limit)?;
        Ok(Self::page(&self.lock_state().top_artists, limit, offset))
    }

    async fn has_active_device(&self) -> SpotifyResult<bool> {
        self.record(MusicCall::HasActiveDevice);
        Ok(self.lock_state().active_device)
    }

    async fn profile(&self) -> SpotifyResult<UserProfile> {
        self.record(MusicCall::Profile);
        Ok(UserProfile {
            id: "fake-user".to_string(),
            display_name: Some("Fake User".to_string()),
            url: Some("https://open.spotify.com/user/fake-user".to_string()),
            image_url: None,
        })
    }
}
