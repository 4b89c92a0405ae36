//! Registry of the operations the model may call
//!
//! [`Operation`] is both the schema list sent with every completion request
//! and the dispatch table: every variant has a name, a description, a JSON
//! parameter schema, an implementation ([`Operation::invoke`]) and an output
//! template ([`OperationOutput::render`]). Schemas and dispatch are derived
//! from the same [`Operation::ALL`] list, so they cannot drift apart.

mod operations;
mod output;

pub use operations::PAGE_LIMIT;
pub use output::OperationOutput;

use cadence_llm_client::ToolDefinition;
use serde_json::{json, Value};

use crate::error::ToolError;

/// One callable operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PlayTrack,
    PausePlayback,
    ResumePlayback,
    AddToQueue,
    SwitchToNextTrack,
    SwitchToPreviousTrack,
    GetCurrentPlayback,
    CreatePlaylistWithTracks,
    GetTopTracks,
    GetTopArtists,
}

/// Name, description and JSON parameter schema of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    /// Keys listed under `required` in the parameter schema
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            self.name.clone(),
            self.description.clone(),
            self.parameters.clone(),
        )
    }
}

impl Operation {
    /// Every operation, in the order schemas are declared to the model
    pub const ALL: [Operation; 10] = [
        Operation::PlayTrack,
        Operation::PausePlayback,
        Operation::ResumePlayback,
        Operation::SwitchToNextTrack,
        Operation::SwitchToPreviousTrack,
        Operation::AddToQueue,
        Operation::GetCurrentPlayback,
        Operation::CreatePlaylistWithTracks,
        Operation::GetTopTracks,
        Operation::GetTopArtists,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::PlayTrack => "play_track",
            Operation::PausePlayback => "pause_playback",
            Operation::ResumePlayback => "resume_playback",
            Operation::AddToQueue => "add_to_queue",
            Operation::SwitchToNextTrack => "switch_to_next_track",
            Operation::SwitchToPreviousTrack => "switch_to_previous_track",
            Operation::GetCurrentPlayback => "get_current_playback",
            Operation::CreatePlaylistWithTracks => "create_playlist_with_tracks",
            Operation::GetTopTracks => "get_top_tracks",
            Operation::GetTopArtists => "get_top_artists",
        }
    }

    pub fn from_name(name: &str) -> Option<Operation> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::PlayTrack => {
                "Play a song. Call this whenever you are asked to play something, \
                 for example when user says 'play a song'"
            }
            Operation::PausePlayback => {
                "Pause playback of a track. Call this whenever you are asked to stop or pause \
                 playing something, for example when user says 'pause'"
            }
            Operation::ResumePlayback => {
                "Resume playback of a track. Call this whenever you are asked to resume or \
                 start playing something (but if user asks you to play a certain song, \
                 you should not call this function), for example when user says 'play'"
            }
            Operation::AddToQueue => {
                "Add tracks to a playing queue. For example, when user says 'add to queue \
                 track1 and track2', you should call this function with parameter \
                 ['track1', 'track2']"
            }
            Operation::SwitchToNextTrack => {
                "Switch current playback to a next track. For example, when users says \
                 'play next track', you should call this function."
            }
            Operation::SwitchToPreviousTrack => {
                "Switch current playback to a previous track. For example, when users says \
                 'play previous track', you should call this function"
            }
            Operation::GetCurrentPlayback => {
                "Get the current playback. For example, when users says 'what is playing', \
                 you should call this function"
            }
            Operation::CreatePlaylistWithTracks => {
                "Create a playlist with tracks. Call this function when you want to create a \
                 playlist that contains the tracks based on user's description."
            }
            Operation::GetTopTracks => {
                "Get user's favorite tracks. Call this function when you want to get user's \
                 top tracks"
            }
            Operation::GetTopArtists => {
                "Get user's favorite artists. Call this function when you want to get user's \
                 top artists, performers, or bands"
            }
        }
    }

    /// JSON schema of the operation's arguments
    pub fn parameters(&self) -> Value {
        match self {
            Operation::PlayTrack => json!({
                "type": "object",
                "properties": {
                    "track_name": {
                        "type": "string",
                        "description": "Title of a track to play"
                    }
                },
                "required": ["track_name"],
                "additionalProperties": false
            }),
            Operation::AddToQueue => json!({
                "type": "object",
                "properties": {
                    "tracks": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Titles of tracks, each and every one put in a list"
                    }
                },
                "required": ["tracks"],
                "additionalProperties": false
            }),
            Operation::CreatePlaylistWithTracks => json!({
                "type": "object",
                "properties": {
                    "tracks": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Titles of tracks based on user's response."
                    },
                    "name": {
                        "type": "string",
                        "description": "Name of the playlist. If not provided, come up with a name yourself"
                    }
                },
                "required": ["tracks", "name"],
                "additionalProperties": false
            }),
            Operation::GetTopTracks => json!({
                "type": "object",
                "properties": {
                    "tracks": {
                        "type": "integer",
                        "description": "Number of top tracks to get"
                    }
                },
                "required": ["tracks"],
                "additionalProperties": false
            }),
            Operation::GetTopArtists => json!({
                "type": "object",
                "properties": {
                    "tracks": {
                        "type": "integer",
                        "description": "Number of top artists to get"
                    }
                },
                "required": ["tracks"],
                "additionalProperties": false
            }),
            Operation::PausePlayback
            | Operation::ResumePlayback
            | Operation::SwitchToNextTrack
            | Operation::SwitchToPreviousTrack
            | Operation::GetCurrentPlayback => json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Schemas of every operation, in declaration order
pub fn all_schemas() -> Vec<ToolSchema> {
    Operation::ALL.iter().map(Operation::schema).collect()
}

/// Resolve a model-supplied name to its operation
pub fn entry_for(name: &str) -> Result<Operation, ToolError> {
    Operation::from_name(name).ok_or_else(|| ToolError::UnknownOperation(name.to_string()))
}

/// Tool definitions for the completion request
pub fn tool_definitions() -> Vec<ToolDefinition> {
    all_schemas().iter().map(ToolSchema::to_definition).collect()
}
