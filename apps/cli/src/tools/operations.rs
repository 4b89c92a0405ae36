//! Operation implementations against a [`MusicService`]

use cadence_spotify_client::{MusicService, SpotifyError, Track, MAX_PAGE_SIZE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::{Operation, OperationOutput};
use crate::error::ToolError;

/// Page size used when fetching top tracks and artists
pub const PAGE_LIMIT: u32 = MAX_PAGE_SIZE;

/// `(limit, offset)` pairs covering the first `count` entries
fn page_plan(count: u32) -> Vec<(u32, u32)> {
    let full_pages = count / PAGE_LIMIT;
    let remainder = count % PAGE_LIMIT;

    let mut pages: Vec<(u32, u32)> = (0..full_pages)
        .map(|page| (PAGE_LIMIT, page * PAGE_LIMIT))
        .collect();
    if remainder > 0 {
        pages.push((remainder, full_pages * PAGE_LIMIT));
    }
    pages
}

fn page_count(operation: Operation, requested: i64) -> Result<u32, ToolError> {
    if requested < 1 {
        return Err(ToolError::malformed(
            operation.name(),
            format!("'tracks' must be at least 1, got {}", requested),
        ));
    }
    u32::try_from(requested)
        .map_err(|_| ToolError::malformed(operation.name(), "'tracks' is too large"))
}

/// Search for one title of a batch; a title Spotify refuses to search counts as a miss
async fn find_track(music: &dyn MusicService, title: &str) -> Result<Option<Track>, ToolError> {
    match music.search_track(title).await {
        Ok(track) => Ok(track),
        Err(SpotifyError::InvalidInput(reason)) => {
            warn!(title = %title, reason = %reason, "Unsearchable title, skipping");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

impl Operation {
    /// Run the operation with already-parsed arguments
    ///
    /// Required keys are checked against the schema before the arguments are
    /// decoded, so a missing key and a wrong type both surface as
    /// [`ToolError::MalformedArguments`]. `Ok(None)` means the call had
    /// nothing to report.
    #[instrument(skip(self, music, arguments), fields(operation = %self))]
    pub async fn invoke(
        &self,
        music: &dyn MusicService,
        arguments: &Map<String, Value>,
    ) -> Result<Option<OperationOutput>, ToolError> {
        let schema = self.schema();
        if let Some(missing) = schema
            .required()
            .into_iter()
            .find(|key| !arguments.contains_key(*key))
        {
            return Err(ToolError::malformed(
                self.name(),
                format!("missing required argument '{}'", missing),
            ));
        }

        match self {
            Operation::PlayTrack => self.play_track(music, arguments).await,
            Operation::PausePlayback => pause_playback(music).await,
            Operation::ResumePlayback => resume_playback(music).await,
            Operation::AddToQueue => self.add_to_queue(music, arguments).await,
            Operation::SwitchToNextTrack => switch_to_next_track(music).await,
            Operation::SwitchToPreviousTrack => {
                music.skip_previous().await?;
                Ok(Some(OperationOutput::Status(
                    "Switching to previous track...".to_string(),
                )))
            }
            Operation::GetCurrentPlayback => get_current_playback(music).await,
            Operation::CreatePlaylistWithTracks => {
                self.create_playlist_with_tracks(music, arguments).await
            }
            Operation::GetTopTracks => self.top_tracks(music, arguments).await,
            Operation::GetTopArtists => self.top_artists(music, arguments).await,
        }
    }

    fn decode<T: DeserializeOwned>(&self, arguments: &Map<String, Value>) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(arguments.clone()))
            .map_err(|e| ToolError::malformed(self.name(), e.to_string()))
    }

    async fn play_track(
        &self,
        music: &dyn MusicService,
        arguments: &Map<String, Value>,
    ) -> Result<Option<OperationOutput>, ToolError> {
        #[derive(Deserialize)]
        struct Args {
            track_name: String,
        }

        let args: Args = self.decode(arguments)?;
        let track = music
            .search_track(&args.track_name)
            .await?
            .ok_or_else(|| ToolError::NotFound(args.track_name.clone()))?;

        // Queue then skip rather than start playback directly, which would
        // replace the user's queue
        music.enqueue(&track.uri).await?;
        music.skip_next().await?;

        Ok(Some(OperationOutput::Detail(track.display())))
    }

    async fn add_to_queue(
        &self,
        music: &dyn MusicService,
        arguments: &Map<String, Value>,
    ) -> Result<Option<OperationOutput>, ToolError> {
        #[derive(Deserialize)]
        struct Args {
            tracks: Vec<String>,
        }

        let args: Args = self.decode(arguments)?;
        if args.tracks.is_empty() {
            return Ok(None);
        }

        let mut queued = Vec::new();
        let mut missing = Vec::new();
        for title in &args.tracks {
            match find_track(music, title).await? {
                Some(track) => {
                    if let Err(e) = music.enqueue(&track.uri).await {
                        let err = ToolError::from(e);
                        if queued.is_empty() {
                            return Err(err);
                        }
                        // Already queued tracks stay queued
                        warn!(error = %err, queued = queued.len(), "Queueing stopped partway");
                        return Ok(Some(OperationOutput::Status(format!(
                            "Added {} to the queue, then stopped: {}",
                            queued.join(", "),
                            err
                        ))));
                    }
                    queued.push(track.display());
                }
                None => {
                    warn!(title = %title, "No search result, skipping");
                    if !title.trim().is_empty() {
                        missing.push(title.as_str());
                    }
                }
            }
        }

        let output = match (queued.is_empty(), missing.is_empty()) {
            (true, true) => {
                OperationOutput::Status("None of the requested tracks had a title".to_string())
            }
            (true, false) => OperationOutput::Status(format!(
                "Couldn't find any of the requested tracks: {}",
                missing.join(", ")
            )),
            (false, true) => OperationOutput::Detail(queued.join(", ")),
            (false, false) => OperationOutput::Status(format!(
                "Added {} to the queue (couldn't find: {})",
                queued.join(", "),
                missing.join(", ")
            )),
        };
        Ok(Some(output))
    }

    async fn create_playlist_with_tracks(
        &self,
        music: &dyn MusicService,
        arguments: &Map<String, Value>,
    ) -> Result<Option<OperationOutput>, ToolError> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
            tracks: Vec<String>,
        }

        let args: Args = self.decode(arguments)?;
        let name = args.name.trim();
        if name.is_empty() {
            return Err(ToolError::malformed(
                self.name(),
                "playlist name cannot be empty",
            ));
        }

        let playlist = music.create_playlist(name).await?;

        let mut uris = Vec::with_capacity(args.tracks.len());
        for title in &args.tracks {
            match find_track(music, title).await? {
                Some(track) => uris.push(track.uri),
                None => warn!(title = %title, "No search result, leaving out of playlist"),
            }
        }

        if !uris.is_empty() {
            music.add_items_to_playlist(&playlist.id, &uris).await?;
        }

        debug!(
            playlist_id = %playlist.id,
            requested = args.tracks.len(),
            added = uris.len(),
            "Playlist created"
        );

        let url = playlist
            .url
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", playlist.id));
        Ok(Some(OperationOutput::Detail(url)))
    }

    async fn top_tracks(
        &self,
        music: &dyn MusicService,
        arguments: &Map<String, Value>,
    ) -> Result<Option<OperationOutput>, ToolError> {
        #[derive(Deserialize)]
        struct Args {
            tracks: i64,
        }

        let args: Args = self.decode(arguments)?;
        let count = page_count(*self, args.tracks)?;

        let mut tracks: Vec<Track> = Vec::new();
        for (limit, offset) in page_plan(count) {
            let page = music.top_tracks_page(limit, offset).await?;
            let exhausted = page.len() < limit as usize;
            tracks.extend(page);
            if exhausted {
                break;
            }
        }

        if tracks.is_empty() {
            return Ok(Some(OperationOutput::Status(
                "You don't have any top tracks yet".to_string(),
            )));
        }
        Ok(Some(OperationOutput::Listing(
            tracks.iter().map(Track::display).collect(),
        )))
    }

    async fn top_artists(
        &self,
        music: &dyn MusicService,
        arguments: &Map<String, Value>,
    ) -> Result<Option<OperationOutput>, ToolError> {
        #[derive(Deserialize)]
        struct Args {
            tracks: i64,
        }

        let args: Args = self.decode(arguments)?;
        let count = page_count(*self, args.tracks)?;

        let mut names = Vec::new();
        for (limit, offset) in page_plan(count) {
            let page = music.top_artists_page(limit, offset).await?;
            let exhausted = page.len() < limit as usize;
            names.extend(page.into_iter().map(|artist| artist.name));
            if exhausted {
                break;
            }
        }

        if names.is_empty() {
            return Ok(Some(OperationOutput::Status(
                "You don't have any top artists yet".to_string(),
            )));
        }
        Ok(Some(OperationOutput::Listing(names)))
    }
}

async fn pause_playback(music: &dyn MusicService) -> Result<Option<OperationOutput>, ToolError> {
    let playing = music
        .current_playback()
        .await?
        .is_some_and(|state| state.is_playing);

    if !playing {
        return Ok(Some(OperationOutput::Status(
            "Playback is already paused".to_string(),
        )));
    }

    music.pause().await?;
    Ok(Some(OperationOutput::Status("Stopped playback".to_string())))
}

async fn resume_playback(music: &dyn MusicService) -> Result<Option<OperationOutput>, ToolError> {
    let playing = music
        .current_playback()
        .await?
        .is_some_and(|state| state.is_playing);

    if playing {
        return Ok(Some(OperationOutput::Status(
            "Playback is already playing".to_string(),
        )));
    }

    music.resume().await?;
    Ok(Some(OperationOutput::Status("Resumed playback".to_string())))
}

async fn switch_to_next_track(
    music: &dyn MusicService,
) -> Result<Option<OperationOutput>, ToolError> {
    music.skip_next().await?;

    let output = match music.current_playback().await?.and_then(|state| state.item) {
        Some(track) => OperationOutput::Detail(track.display()),
        None => OperationOutput::Status("Skipped to the next track".to_string()),
    };
    Ok(Some(output))
}

async fn get_current_playback(
    music: &dyn MusicService,
) -> Result<Option<OperationOutput>, ToolError> {
    let output = match music.current_playback().await?.and_then(|state| state.item) {
        Some(track) => OperationOutput::Detail(track.display()),
        None => OperationOutput::Status("No track is currently playing".to_string()),
    };
    Ok(Some(output))
}
