//! Mock chat-completions server for testing streamed turns
//!
//! Provides a [`MockLlmServer`] that answers `POST /v1/chat/completions` with
//! server-sent-event bodies, so turn processing can be tested without a real
//! provider.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Matches requests by whether they declare tool schemas
///
/// The tool-calling pass sends `tools`; the narration pass does not.
struct DeclaresTools(bool);

impl Match for DeclaresTools {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .map(|body| body.get("tools").is_some() == self.0)
            .unwrap_or(false)
    }
}

/// A scripted tool call: name plus the raw argument text the model streams
#[derive(Debug, Clone)]
pub struct ToolCallFixture {
    pub name: String,
    pub arguments: String,
}

impl ToolCallFixture {
    pub fn new(name: &str, arguments: Value) -> Self {
        Self {
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    /// A call whose argument text is not valid JSON
    pub fn raw(name: &str, arguments: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

/// Build one `chat.completion.chunk` carrying a text delta
pub fn text_chunk(content: &str) -> Value {
    json!({
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
}

/// Build the chunks that stream `calls`, splitting each argument string into
/// pieces of at most `piece_len` characters
pub fn tool_call_chunks(calls: &[ToolCallFixture], piece_len: usize) -> Vec<Value> {
    let piece_len = piece_len.max(1);
    let mut chunks = Vec::new();

    for (index, call) in calls.iter().enumerate() {
        chunks.push(json!({
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"tool_calls": [{
                "index": index,
                "id": format!("call_{}", index),
                "type": "function",
                "function": {"name": call.name, "arguments": ""}
            }]}}]
        }));

        let chars: Vec<char> = call.arguments.chars().collect();
        for piece in chars.chunks(piece_len) {
            let piece: String = piece.iter().collect();
            chunks.push(json!({
                "object": "chat.completion.chunk",
                "choices": [{"index": 0, "delta": {"tool_calls": [{
                    "index": index,
                    "function": {"arguments": piece}
                }]}}]
            }));
        }
    }

    chunks.push(json!({
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]
    }));

    chunks
}

/// Serialise chunks as an SSE body, optionally ending with `data: [DONE]`
pub fn sse_body(chunks: &[Value], terminated: bool) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(&chunk.to_string());
        body.push_str("\n\n");
    }
    if terminated {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

fn words(text: &str) -> Vec<Value> {
    text.split_inclusive(' ').map(text_chunk).collect()
}

fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

/// Mock chat-completions server
///
/// # Example
///
/// ```rust,ignore
/// use cadence_test_utils::{MockLlmServer, ToolCallFixture};
///
/// #[tokio::test]
/// async fn test_turn() {
///     let llm = MockLlmServer::start().await;
///     llm.mock_tool_calls(&[ToolCallFixture::new("pause_playback", json!({}))]).await;
///     llm.mock_narration("Paused it for you.").await;
///
///     // Configure the client with LlmConfig::with_url(llm.url())
/// }
/// ```
pub struct MockLlmServer {
    server: MockServer,
}

impl MockLlmServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// API base URL (ends in `/v1`)
    pub fn url(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// Get reference to the underlying mock server for custom mock setups
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Mount a plain text answer for the tool-calling pass
    pub async fn mock_text_reply(&self, text: &str) {
        self.mock_tool_pass(sse_body(&words(text), true)).await;
    }

    /// Mount a tool-calling pass that streams `calls` in small fragments
    pub async fn mock_tool_calls(&self, calls: &[ToolCallFixture]) {
        self.mock_tool_pass(sse_body(&tool_call_chunks(calls, 4), true))
            .await;
    }

    /// Mount a tool-calling pass that streams text and then stops without `[DONE]`
    pub async fn mock_interrupted_reply(&self, partial_text: &str) {
        self.mock_tool_pass(sse_body(&words(partial_text), false))
            .await;
    }

    /// Mount a tool-calling pass from raw chunks
    pub async fn mock_tool_pass_chunks(&self, chunks: &[Value]) {
        self.mock_tool_pass(sse_body(chunks, true)).await;
    }

    async fn mock_tool_pass(&self, body: String) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(DeclaresTools(true))
            .respond_with(sse_response(body))
            .mount(&self.server)
            .await;
    }

    /// Mount the tool-less narration pass
    pub async fn mock_narration(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(DeclaresTools(false))
            .respond_with(sse_response(sse_body(&words(text), true)))
            .mount(&self.server)
            .await;
    }

    /// Mount a failing narration pass
    pub async fn mock_narration_failure(&self, status_code: u16) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(DeclaresTools(false))
            .respond_with(ResponseTemplate::new(status_code).set_body_json(json!({
                "error": {"message": "narration unavailable", "type": "server_error"}
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a failure for every completion request
    pub async fn mock_failure(&self, status_code: u16, error_message: &str) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(status_code).set_body_json(json!({
                "error": {"message": error_message, "type": "server_error"}
            })))
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of every completion request received so far
    pub async fn requests(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == COMPLETIONS_PATH)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
