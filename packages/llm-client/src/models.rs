//! Request and response types for the chat completions API

use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: ChatRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Tool definition in the function-calling format
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Wrap a function definition as a `"function"` tool
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function declared to the model
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
}

/// Request body for `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One `data:` payload of a streamed completion
#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

/// A streamed choice; only the first choice is ever requested
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: RawDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<RawToolCallDelta>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<RawFunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Normalised content of a streamed chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    /// Visible text to append to the reply
    Text(String),
    /// Fragment of a tool call, keyed by the stream-assigned index
    ToolCall {
        index: u32,
        /// Present on the first fragment of an index only
        name: Option<String>,
        /// Argument text to concatenate
        arguments: String,
    },
}

impl ChatStreamChunk {
    /// Flatten the first choice into text and tool-call deltas, in wire order
    pub fn deltas(&self) -> Vec<StreamDelta> {
        let Some(choice) = self.choices.first() else {
            return Vec::new();
        };

        let mut deltas = Vec::new();

        if let Some(content) = choice.delta.content.as_deref().filter(|c| !c.is_empty()) {
            deltas.push(StreamDelta::Text(content.to_string()));
        }

        for call in choice.delta.tool_calls.iter().flatten() {
            let function = call.function.clone().unwrap_or_default();
            deltas.push(StreamDelta::ToolCall {
                index: call.index,
                name: function.name.filter(|n| !n.is_empty()),
                arguments: function.arguments.unwrap_or_default(),
            });
        }

        deltas
    }

    /// Finish reason of the first choice, if the provider sent one
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first()?.finish_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, ChatRole::System);
        assert_eq!(ChatMessage::user("u").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("a").role, ChatRole::Assistant);
    }

    #[test]
    fn test_request_omits_tools_when_absent() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::user("hi")],
            tools: None,
            stream: true,
            temperature: Some(0.7),
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_tool_definition_serialization() {
        let tool = ToolDefinition::function(
            "pause_playback",
            "Pause playback",
            serde_json::json!({"type": "object", "properties": {}}),
        );
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "pause_playback");
    }

    #[test]
    fn test_text_chunk_deltas() {
        let chunk: ChatStreamChunk = serde_json::from_str(
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.deltas(), vec![StreamDelta::Text("Hi".to_string())]);
    }

    #[test]
    fn test_tool_call_chunk_deltas() {
        let chunk: ChatStreamChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[
                {"index":0,"id":"call_a","type":"function","function":{"name":"play_track","arguments":""}},
                {"index":1,"function":{"arguments":"{\"tr"}}
            ]}}]}"#,
        )
        .unwrap();

        assert_eq!(
            chunk.deltas(),
            vec![
                StreamDelta::ToolCall {
                    index: 0,
                    name: Some("play_track".to_string()),
                    arguments: String::new(),
                },
                StreamDelta::ToolCall {
                    index: 1,
                    name: None,
                    arguments: "{\"tr".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_choices_yield_no_deltas() {
        let chunk: ChatStreamChunk =
            serde_json::from_str(r#"{"choices":[],"usage":{"total_tokens":3}}"#).unwrap();
        assert!(chunk.deltas().is_empty());
        assert!(chunk.finish_reason().is_none());
    }

    #[test]
    fn test_empty_name_treated_as_absent() {
        let chunk: ChatStreamChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"","arguments":"{}"}}]},"finish_reason":"tool_calls"}]}"#,
        )
        .unwrap();
        assert_eq!(
            chunk.deltas(),
            vec![StreamDelta::ToolCall {
                index: 0,
                name: None,
                arguments: "{}".to_string(),
            }]
        );
        assert_eq!(chunk.finish_reason(), Some("tool_calls"));
    }
}
