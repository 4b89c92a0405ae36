//! Mock Spotify server for testing the Web API client end to end
//!
//! Provides a [`MockSpotifyServer`] that simulates the accounts token
//! endpoint and the Web API routes the chat operations use.

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cadence_spotify_client::{Artist, Track};

/// Track data used to build API payloads and fake catalogs
#[derive(Debug, Clone)]
pub struct TrackFixture {
    pub id: String,
    pub name: String,
    pub artist: String,
}

impl TrackFixture {
    pub fn new(id: &str, name: &str, artist: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            artist: artist.to_string(),
        }
    }

    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.id)
    }

    /// Convert to JSON in Web API track format
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "uri": self.uri(),
            "artists": [{"id": format!("artist-{}", self.id), "name": self.artist}]
        })
    }

    pub fn to_track(&self) -> Track {
        Track {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            artists: vec![Artist {
                id: Some(format!("artist-{}", self.id)),
                name: self.artist.clone(),
            }],
            uri: self.uri(),
        }
    }
}

/// Mock Spotify accounts service and Web API
///
/// Point the client at it with `SpotifyConfig::with_url(server.url())`.
///
/// # Example
///
/// ```rust,ignore
/// use cadence_test_utils::{MockSpotifyServer, TrackFixture};
///
/// #[tokio::test]
/// async fn test_play() {
///     let spotify = MockSpotifyServer::start().await;
///     spotify.mock_token().await;
///     spotify.mock_search("Hey Jude", Some(TrackFixture::new("1", "Hey Jude", "The Beatles"))).await;
/// }
/// ```
pub struct MockSpotifyServer {
    server: MockServer,
}

impl MockSpotifyServer {
    /// Start a new mock Spotify server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for both the accounts service and the Web API
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Get reference to the underlying mock server for custom mock setups
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Mount a token endpoint that grants `test-access-token`
    pub async fn mock_token(&self) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-access-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-modify-playback-state"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a track search answering `query` with `result`
    pub async fn mock_search(&self, query: &str, result: Option<TrackFixture>) {
        let items: Vec<Value> = result.iter().map(TrackFixture::to_json).collect();

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("q", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tracks": {"items": items, "total": items.len()}
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a player command (`queue`, `next`, `previous`, `pause`, `play`) returning 204
    pub async fn mock_player_command(&self, http_method: &str, command: &str) {
        Mock::given(method(http_method))
            .and(path(format!("/v1/me/player/{}", command)))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;
    }

    /// Mount a player command that fails for lack of an active device
    pub async fn mock_player_command_no_device(&self, http_method: &str, command: &str) {
        Mock::given(method(http_method))
            .and(path(format!("/v1/me/player/{}", command)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "status": 404,
                    "message": "Player command failed: No active device found",
                    "reason": "NO_ACTIVE_DEVICE"
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount the current playback state
    pub async fn mock_current_playback(&self, track: Option<TrackFixture>, is_playing: bool) {
        let response = match track {
            Some(track) => ResponseTemplate::new(200).set_body_json(json!({
                "is_playing": is_playing,
                "item": track.to_json(),
                "device": {"id": "device-1", "name": "Test Device", "is_active": true}
            })),
            None => ResponseTemplate::new(204),
        };

        Mock::given(method("GET"))
            .and(path("/v1/me/player"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Mount the device list with one device
    pub async fn mock_devices(&self, active: bool) {
        Mock::given(method("GET"))
            .and(path("/v1/me/player/devices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "devices": [{"id": "device-1", "name": "Test Device", "is_active": active}]
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount the current user's profile
    pub async fn mock_profile(&self, user_id: &str, display_name: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": user_id,
                "display_name": display_name,
                "external_urls": {"spotify": format!("https://open.spotify.com/user/{}", user_id)},
                "images": []
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a server error for every Web API route
    pub async fn mock_server_error(&self) {
        Mock::given(wiremock::matchers::path_regex("^/v1/.*"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": {"status": 503, "message": "Service unavailable"}
            })))
            .mount(&self.server)
            .await;
    }

    /// Paths of Web API requests received so far, in order
    pub async fn api_paths(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.path().to_string())
            .filter(|p| p.starts_with("/v1/"))
            .collect()
    }
}
