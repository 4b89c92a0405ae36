//! Reassembly of streamed tool calls
//!
//! Providers stream a tool call as a series of fragments sharing an index:
//! the first carries the function name, the rest carry slices of the JSON
//! argument text. Fragments of different calls may interleave, and the text
//! is not valid JSON until the last fragment arrives, so nothing is parsed
//! here.

use std::collections::BTreeMap;

use cadence_llm_client::StreamDelta;

/// One tool call reassembled from the stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallFragment {
    /// Stream-assigned index
    pub index: u32,
    /// Function name; empty if the stream never supplied one
    pub name: String,
    /// Concatenated argument text
    pub arguments: String,
}

/// Collects text and tool-call deltas for one completion stream
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    calls: BTreeMap<u32, ToolCallFragment>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delta, returning its text if it was a text delta
    pub fn push(&mut self, delta: StreamDelta) -> Option<String> {
        match delta {
            StreamDelta::Text(text) => {
                self.text.push_str(&text);
                Some(text)
            }
            StreamDelta::ToolCall {
                index,
                name,
                arguments,
            } => {
                let entry = self.calls.entry(index).or_insert_with(|| ToolCallFragment {
                    index,
                    ..ToolCallFragment::default()
                });
                if let Some(name) = name {
                    if entry.name.is_empty() {
                        entry.name = name;
                    }
                }
                entry.arguments.push_str(&arguments);
                None
            }
        }
    }

    /// Text streamed so far
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    /// Consume the accumulator, returning the text and the calls in index order
    pub fn finish(self) -> (String, Vec<ToolCallFragment>) {
        (self.text, self.calls.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(index: u32, name: Option<&str>, arguments: &str) -> StreamDelta {
        StreamDelta::ToolCall {
            index,
            name: name.map(str::to_string),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_text_is_passed_through() {
        let mut acc = StreamAccumulator::new();
        assert_eq!(acc.push(StreamDelta::Text("Hel".to_string())), Some("Hel".to_string()));
        assert_eq!(acc.push(StreamDelta::Text("lo".to_string())), Some("lo".to_string()));
        assert_eq!(acc.text(), "Hello");
        assert!(!acc.has_tool_calls());
    }

    #[test]
    fn test_interleaved_calls_are_keyed_by_index() {
        let mut acc = StreamAccumulator::new();
        acc.push(call(1, Some("add_to_queue"), ""));
        acc.push(call(0, Some("play_track"), "{\"track_"));
        acc.push(call(1, None, "{\"tracks\":[]}"));
        acc.push(call(0, None, "name\":\"Yellow\"}"));

        let (text, calls) = acc.finish();
        assert!(text.is_empty());
        assert_eq!(
            calls,
            vec![
                ToolCallFragment {
                    index: 0,
                    name: "play_track".to_string(),
                    arguments: "{\"track_name\":\"Yellow\"}".to_string(),
                },
                ToolCallFragment {
                    index: 1,
                    name: "add_to_queue".to_string(),
                    arguments: "{\"tracks\":[]}".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_late_name_fills_empty_slot_only() {
        let mut acc = StreamAccumulator::new();
        acc.push(call(0, None, "{}"));
        acc.push(call(0, Some("pause_playback"), ""));
        acc.push(call(0, Some("resume_playback"), ""));

        let (_, calls) = acc.finish();
        assert_eq!(calls[0].name, "pause_playback");
        assert_eq!(calls[0].arguments, "{}");
    }

    #[test]
    fn test_same_name_twice_stays_two_calls() {
        let mut acc = StreamAccumulator::new();
        acc.push(call(0, Some("switch_to_next_track"), ""));
        acc.push(call(1, Some("switch_to_next_track"), ""));

        let (_, calls) = acc.finish();
        assert_eq!(calls.len(), 2);
    }
}
