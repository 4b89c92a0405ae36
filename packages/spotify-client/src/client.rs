//! Spotify Web API client implementation

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use cadence_shared_config::SpotifyConfig;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{SpotifyError, SpotifyResult};
use crate::models::{
    Artist, DevicesResponse, ErrorResponse, Paging, PlaybackState, Playlist, RawPlaylist,
    RawUserProfile, SearchResponse, TokenErrorResponse, TokenGrant, Track, UserProfile,
};
use crate::service::{MusicService, MAX_PAGE_SIZE};

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Maximum search query length
const MAX_QUERY_LENGTH: usize = 256;

/// Largest number of URIs accepted per playlist insert
const PLAYLIST_BATCH_SIZE: usize = 100;

/// Refresh the access token this long before it actually expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Error reason Spotify reports for player commands with no device
const NO_ACTIVE_DEVICE_REASON: &str = "NO_ACTIVE_DEVICE";

/// Maximum error body size kept in error messages
const MAX_ERROR_BODY_SIZE: usize = 1000;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Spotify Web API client
///
/// Authenticates with the configured refresh token and caches the resulting
/// access token until shortly before it expires. Clones share the cache.
#[derive(Clone)]
pub struct SpotifyClient {
    http_client: Client,
    config: SpotifyConfig,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("client_id", &self.config.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_url", &self.config.api_url)
            .finish()
    }
}

impl SpotifyClient {
    /// Create a new Spotify client
    ///
    /// # Errors
    /// Returns `SpotifyError::InvalidInput` if the client ID or secret is empty
    pub fn new(config: &SpotifyConfig) -> SpotifyResult<Self> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(SpotifyError::InvalidInput(
                "client ID and client secret are required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent("Cadence/0.1")
            .build()?;

        Ok(Self {
            http_client,
            config: config.clone(),
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Validate search query input
    fn validate_query(query: &str) -> SpotifyResult<&str> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(SpotifyError::InvalidInput(
                "search query cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_QUERY_LENGTH {
            return Err(SpotifyError::InvalidInput(format!(
                "search query too long (max {} characters)",
                MAX_QUERY_LENGTH
            )));
        }
        Ok(trimmed)
    }

    fn validate_page_limit(limit: u32) -> SpotifyResult<()> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(SpotifyError::InvalidInput(format!(
                "page limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    fn truncate_error_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_SIZE {
            return body.to_string();
        }
        let truncate_at = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
            .last()
            .unwrap_or(0);
        format!("{}... (truncated)", &body[..truncate_at])
    }

    fn map_send_error(e: reqwest::Error) -> SpotifyError {
        if e.is_timeout() {
            SpotifyError::Timeout
        } else {
            SpotifyError::Http(e)
        }
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.config.client_id, self.config.client_secret);
        format!("Basic {}", BASE64.encode(credentials))
    }

    /// Authorization page URL the user opens to grant the chat scopes
    pub fn authorize_url(&self) -> SpotifyResult<String> {
        let scope = SpotifyConfig::scope_string();
        let url = Url::parse_with_params(
            &self.config.authorize_url(),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
            ],
        )?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for an access and refresh token
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> SpotifyResult<TokenGrant> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SpotifyError::InvalidInput(
                "authorization code cannot be empty".to_string(),
            ));
        }

        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> SpotifyResult<TokenGrant> {
        let response = self
            .http_client
            .post(self.config.token_url())
            .header(AUTHORIZATION, self.basic_auth_header())
            .form(form)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&text)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or_else(|_| format!("status {}", status));
            warn!(status = status.as_u16(), error = %message, "Token request rejected");
            return Err(SpotifyError::Auth(message));
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Current access token, refreshing it when missing or about to expire
    async fn access_token(&self) -> SpotifyResult<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let refresh_token = self
            .config
            .refresh_token
            .as_deref()
            .ok_or(SpotifyError::MissingCredentials)?;

        debug!("Refreshing Spotify access token");

        let grant = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        let value = grant.access_token.clone();
        *cached = Some(CachedToken {
            value: grant.access_token,
            expires_at: Instant::now() + Duration::from_secs(grant.expires_in),
        });

        Ok(value)
    }

    /// Build a Web API URL from path segments, escaping each one
    fn endpoint(&self, segments: &[&str]) -> SpotifyResult<Url> {
        let mut url = Url::parse(&self.config.api_url)?;
        url.path_segments_mut()
            .map_err(|_| {
                SpotifyError::InvalidInput(format!(
                    "{} cannot be used as a base URL",
                    self.config.api_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make an authenticated API request and handle common error cases
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> SpotifyResult<Response> {
        let url = self.endpoint(segments)?;
        let token = self.access_token().await?;

        let request = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(token)
            .query(query);

        let request = match body {
            Some(body) => request.json(&body),
            None if method != Method::GET => request.header(CONTENT_LENGTH, 0),
            None => request,
        };

        let response = request.send().await.map_err(Self::map_send_error)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                self.token.lock().await.take();
                Err(SpotifyError::Unauthorized)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Spotify API rate limited");
                Err(SpotifyError::RateLimited)
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(Self::parse_api_error(status, &text))
            }
        }
    }

    /// Parse an error body into the matching error variant
    fn parse_api_error(status: StatusCode, text: &str) -> SpotifyError {
        match serde_json::from_str::<ErrorResponse>(text) {
            Ok(e) if e.error.reason.as_deref() == Some(NO_ACTIVE_DEVICE_REASON) => {
                SpotifyError::NoActiveDevice
            }
            Ok(e) => SpotifyError::Api {
                status: status.as_u16(),
                message: e.error.message,
                reason: e.error.reason,
            },
            Err(_) => SpotifyError::Api {
                status: status.as_u16(),
                message: Self::truncate_error_body(text),
                reason: None,
            },
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> SpotifyResult<T> {
        let response = self.send(Method::GET, segments, query, None).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn command(&self, method: Method, segments: &[&str], query: &[(&str, &str)]) -> SpotifyResult<()> {
        self.send(method, segments, query, None).await?;
        Ok(())
    }

    async fn top_items<T: DeserializeOwned>(
        &self,
        kind: &str,
        limit: u32,
        offset: u32,
    ) -> SpotifyResult<Vec<T>> {
        Self::validate_page_limit(limit)?;
        let limit = limit.to_string();
        let offset = offset.to_string();

        let page: Paging<T> = self
            .get_json(
                &["me", "top", kind],
                &[
                    ("limit", limit.as_str()),
                    ("offset", offset.as_str()),
                    ("time_range", "long_term"),
                ],
            )
            .await?;

        Ok(page.items)
    }
}

#[async_trait]
impl MusicService for SpotifyClient {
    #[instrument(skip(self))]
    async fn search_track(&self, query: &str) -> SpotifyResult<Option<Track>> {
        let query = Self::validate_query(query)?;

        let response: SearchResponse = self
            .get_json(&["search"], &[("q", query), ("type", "track"), ("limit", "1")])
            .await?;

        let track = response.tracks.items.into_iter().next();
        debug!(query = %query, found = track.is_some(), "Track search finished");

        Ok(track)
    }

    #[instrument(skip(self))]
    async fn enqueue(&self, uri: &str) -> SpotifyResult<()> {
        self.command(Method::POST, &["me", "player", "queue"], &[("uri", uri)])
            .await
    }

    async fn skip_next(&self) -> SpotifyResult<()> {
        self.command(Method::POST, &["me", "player", "next"], &[]).await
    }

    async fn skip_previous(&self) -> SpotifyResult<()> {
        self.command(Method::POST, &["me", "player", "previous"], &[])
            .await
    }

    async fn pause(&self) -> SpotifyResult<()> {
        self.command(Method::PUT, &["me", "player", "pause"], &[]).await
    }

    async fn resume(&self) -> SpotifyResult<()> {
        self.command(Method::PUT, &["me", "player", "play"], &[]).await
    }

    async fn current_playback(&self) -> SpotifyResult<Option<PlaybackState>> {
        let response = self
            .send(Method::GET, &["me", "player"], &[], None)
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&text)?))
    }

    #[instrument(skip(self))]
    async fn create_playlist(&self, name: &str) -> SpotifyResult<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SpotifyError::InvalidInput(
                "playlist name cannot be empty".to_string(),
            ));
        }

        let user = self.profile().await?;
        let response = self
            .send(
                Method::POST,
                &["users", user.id.as_str(), "playlists"],
                &[],
                Some(serde_json::json!({ "name": name, "public": true })),
            )
            .await?;

        let raw: RawPlaylist = serde_json::from_str(&response.text().await?)?;
        debug!(playlist_id = %raw.id, "Playlist created");

        Ok(raw.into())
    }

    #[instrument(skip(self, uris), fields(count = uris.len()))]
    async fn add_items_to_playlist(&self, playlist_id: &str, uris: &[String]) -> SpotifyResult<()> {
        for batch in uris.chunks(PLAYLIST_BATCH_SIZE) {
            self.send(
                Method::POST,
                &["playlists", playlist_id, "tracks"],
                &[],
                Some(serde_json::json!({ "uris": batch })),
            )
            .await?;
        }
        Ok(())
    }

    async fn top_tracks_page(&self, limit: u32, offset: u32) -> SpotifyResult<Vec<Track>> {
        self.top_items("tracks", limit, offset).await
    }

    async fn top_artists_page(&self, limit: u32, offset: u32) -> SpotifyResult<Vec<Artist>> {
        self.top_items("artists", limit, offset).await
    }

    async fn has_active_device(&self) -> SpotifyResult<bool> {
        let response: DevicesResponse = self.get_json(&["me", "player", "devices"], &[]).await?;
        Ok(response.devices.iter().any(|d| d.is_active))
    }

    async fn profile(&self) -> SpotifyResult<UserProfile> {
        let raw: RawUserProfile = self.get_json(&["me"], &[]).await?;
        Ok(raw.into())
    }
}
