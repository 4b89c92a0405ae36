//! Server-sent-events adapter for streamed completions

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{Event, EventStream, Eventsource};
use futures_util::Stream;
use tracing::{trace, warn};

use crate::error::{LlmError, LlmResult};
use crate::models::ChatStreamChunk;

/// Terminator payload sent after the last chunk
const DONE_MARKER: &str = "[DONE]";

/// Parsed completion chunks over an SSE byte stream
///
/// Yields [`LlmError::StreamInterrupted`] if the body ends before the
/// `[DONE]` terminator, so a dropped connection never looks like a short reply.
pub(crate) struct CompletionStream<S> {
    events: EventStream<S>,
    terminated: bool,
}

impl<S, B, E> CompletionStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    pub(crate) fn new(bytes: S) -> Self {
        Self {
            events: bytes.eventsource(),
            terminated: false,
        }
    }
}

/// Message carried by an in-stream `{"error": ...}` payload
fn api_error_message(value: &serde_json::Value) -> Option<String> {
    let error = value.get("error")?;
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .unwrap_or("an error occurred during streaming");
    Some(message.to_string())
}

/// `None` for the terminator, otherwise the parsed chunk
fn parse_event(event: &Event) -> Option<LlmResult<ChatStreamChunk>> {
    trace!(data = %event.data, "SSE event");

    if event.data.trim() == DONE_MARKER {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(&event.data) {
        Ok(value) => value,
        Err(e) => return Some(Err(LlmError::JsonError(e))),
    };

    if let Some(message) = api_error_message(&value) {
        return Some(Err(LlmError::StreamError(message)));
    }

    Some(serde_json::from_value(value).map_err(LlmError::from))
}

impl<S, B, E> Stream for CompletionStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    type Item = LlmResult<ChatStreamChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.terminated {
            return Poll::Ready(None);
        }

        loop {
            let event = match Pin::new(&mut this.events).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => event,
                Poll::Ready(Some(Err(e))) => {
                    this.terminated = true;
                    return Poll::Ready(Some(Err(LlmError::StreamError(e.to_string()))));
                }
                Poll::Ready(None) => {
                    this.terminated = true;
                    warn!("Completion stream closed without [DONE]");
                    return Poll::Ready(Some(Err(LlmError::StreamInterrupted)));
                }
                Poll::Pending => return Poll::Pending,
            };

            // Comment-only blocks dispatch with no data
            if event.data.is_empty() {
                continue;
            }

            return match parse_event(&event) {
                Some(item) => Poll::Ready(Some(item)),
                None => {
                    this.terminated = true;
                    Poll::Ready(None)
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use tokio_stream::iter;

    fn byte_stream(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        iter(
            parts
                .iter()
                .map(|p| Ok::<_, std::io::Error>(Bytes::from(p.to_string())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(parts: &[&str]) -> Vec<LlmResult<ChatStreamChunk>> {
        CompletionStream::new(byte_stream(parts)).collect().await
    }

    #[tokio::test]
    async fn test_parses_events_until_done() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;

        assert_eq!(items.len(), 2);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.choices[0].delta.content.as_deref(), Some("Hel"));
    }

    #[tokio::test]
    async fn test_event_split_across_chunks() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":",
            "{\"content\":\"split\"}}]}\n",
            "\ndata: [DONE]\n\n",
        ])
        .await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap().choices[0].delta.content.as_deref(),
            Some("split")
        );
    }

    #[tokio::test]
    async fn test_events_after_done_are_ignored() {
        let items = collect(&[
            "data: {\"choices\":[]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[]}\n\n",
        ])
        .await;

        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_comments_and_crlf_are_handled() {
        let items = collect(&[
            ": keep-alive\r\n\r\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n",
            "data: [DONE]\r\n\r\n",
        ])
        .await;

        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[tokio::test]
    async fn test_missing_done_is_interruption() {
        let items = collect(&["data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n"]).await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_matches!(items[1], Err(LlmError::StreamInterrupted));
    }

    #[tokio::test]
    async fn test_error_event() {
        let items = collect(&["data: {\"error\":{\"message\":\"quota exceeded\"}}\n\n"]).await;

        assert_matches!(&items[0], Err(LlmError::StreamError(msg)) if msg == "quota exceeded");
    }

    #[tokio::test]
    async fn test_invalid_json_reported_and_stream_continues() {
        let items = collect(&[
            "data: not json\n\n",
            "data: {\"choices\":[]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;

        assert_eq!(items.len(), 2);
        assert_matches!(items[0], Err(LlmError::JsonError(_)));
        assert!(items[1].is_ok());
    }

    #[tokio::test]
    async fn test_transport_error_terminates_stream() {
        let chunks = vec![
            Ok(Bytes::from("data: {\"choices\":[]}\n\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from("data: [DONE]\n\n")),
        ];

        let items: Vec<_> = CompletionStream::new(iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_matches!(items[1], Err(LlmError::StreamError(_)));
    }
}
