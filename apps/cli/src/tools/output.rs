//! Operation results and their user-facing templates

use super::Operation;

/// What an operation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    /// Subject filled into the operation's template, e.g. `Hey Jude by The Beatles`
    Detail(String),
    /// Entries of a ranked listing
    Listing(Vec<String>),
    /// Complete sentence shown as-is
    Status(String),
}

impl OperationOutput {
    /// Untemplated result text, as handed to the narration prompt
    pub fn details(&self) -> String {
        match self {
            OperationOutput::Detail(text) | OperationOutput::Status(text) => text.clone(),
            OperationOutput::Listing(entries) => entries.join("\n\n"),
        }
    }

    /// Render through `operation`'s template
    pub fn render(&self, operation: Operation) -> String {
        match (operation, self) {
            (Operation::PlayTrack, OperationOutput::Detail(track)) => format!("Playing {}", track),
            (Operation::AddToQueue, OperationOutput::Detail(tracks)) => {
                format!("Added {} to the queue", tracks)
            }
            (Operation::SwitchToNextTrack, OperationOutput::Detail(track)) => {
                format!("Skipping to {}", track)
            }
            (Operation::GetCurrentPlayback, OperationOutput::Detail(track)) => {
                format!("Currently playing: {}", track)
            }
            (Operation::CreatePlaylistWithTracks, OperationOutput::Detail(url)) => {
                format!("Here's your playlist: {}", url)
            }
            (Operation::GetTopTracks, OperationOutput::Listing(entries)) => format!(
                "Here are your top tracks of all time:\n\n{}",
                entries.join("\n\n")
            ),
            (Operation::GetTopArtists, OperationOutput::Listing(entries)) => format!(
                "Here are your top artists of all time:\n\n{}",
                entries.join("\n\n")
            ),
            (_, other) => other.details(),
        }
    }
}
