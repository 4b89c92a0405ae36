//! Spotify Web API response models

use serde::{Deserialize, Serialize};

/// A track from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Spotify ID; absent for local files
    #[serde(default)]
    pub id: Option<String>,
    /// Track title
    pub name: String,
    /// Performing artists, primary artist first
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Spotify URI used for queueing and playlists
    pub uri: String,
}

impl Track {
    /// Name of the primary artist
    pub fn artist_name(&self) -> &str {
        self.artists
            .first()
            .map(|a| a.name.as_str())
            .unwrap_or("Unknown artist")
    }

    /// `"{title} by {artist}"`
    pub fn display(&self) -> String {
        format!("{} by {}", self.name, self.artist_name())
    }
}

/// An artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// A playback device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Current playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    #[serde(default)]
    pub is_playing: bool,
    /// Currently loaded track; `None` for podcasts and ads
    #[serde(default)]
    pub item: Option<Track>,
    #[serde(default)]
    pub device: Option<Device>,
}

/// A created playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// Public web URL
    pub url: Option<String>,
}

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    /// Public profile URL
    pub url: Option<String>,
    /// First avatar image, if any
    pub image_url: Option<String>,
}

/// Tokens returned by the accounts service
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Only sent on the authorization-code exchange (and occasionally on refresh)
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

// Internal response types for deserialization

#[derive(Debug, Deserialize)]
pub(crate) struct Paging<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: Paging<Track>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawImage {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl From<RawPlaylist> for Playlist {
    fn from(raw: RawPlaylist) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            url: raw.external_urls.spotify,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawUserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub images: Vec<RawImage>,
}

impl From<RawUserProfile> for UserProfile {
    fn from(raw: RawUserProfile) -> Self {
        Self {
            id: raw.id,
            display_name: raw.display_name.filter(|n| !n.is_empty()),
            url: raw.external_urls.spotify,
            image_url: raw.images.into_iter().next().map(|i| i.url),
        }
    }
}

/// Web API error envelope: `{"error": {"status", "message", "reason"}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Accounts service error: `{"error": "invalid_grant", "error_description": ...}`
#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
