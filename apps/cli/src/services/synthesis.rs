//! Turning dispatch results into the assistant's reply

use cadence_llm_client::{ChatMessage, LlmClient, LlmResult, StreamDelta};
use cadence_shared_config::SynthesisPolicy;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use super::chat::StreamEvent;
use super::dispatch::DispatchResult;

/// System prompt of the narration completion
pub const NARRATION_SYSTEM_PROMPT: &str = "You are a chatbot that interacts with Spotify API. \
    You are given a task to create a response to a tool call. Based on description of the tool \
    call and its arguments, you should create a unique response that will be returned to the user.";

/// Reply used when no call produced any text
const NOTHING_TO_REPORT: &str = "Done.";

/// Templated results joined in call order with a blank line
pub fn direct_text(results: &[DispatchResult]) -> String {
    let text = results
        .iter()
        .filter_map(DispatchResult::rendered)
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.is_empty() {
        NOTHING_TO_REPORT.to_string()
    } else {
        text
    }
}

/// Prompt describing what was called, with which arguments, and what happened
pub fn narration_prompt(results: &[DispatchResult]) -> String {
    let descriptions: Vec<&str> = results.iter().map(|r| r.description.as_str()).collect();

    let arguments: Vec<String> = results
        .iter()
        .filter(|r| match &r.arguments {
            serde_json::Value::Object(map) => !map.is_empty(),
            serde_json::Value::String(raw) => !raw.is_empty(),
            _ => true,
        })
        .map(|r| r.arguments.to_string())
        .collect();

    let details: Vec<String> = results.iter().filter_map(DispatchResult::details).collect();

    format!(
        "Function(s) called: {}\n\nArguments passed: {}\n\nDetails: {}",
        descriptions.join(", "),
        arguments.join(", "),
        details.join(", ")
    )
}

/// Whether `policy` asks for a narration of `results`
pub fn should_narrate(policy: SynthesisPolicy, results: &[DispatchResult]) -> bool {
    match policy {
        SynthesisPolicy::Direct => false,
        SynthesisPolicy::Narrated => true,
        SynthesisPolicy::NarratedUnlessFailed => results.iter().all(DispatchResult::is_ok),
    }
}

/// Produce the reply for `results`, streaming it through `tx`
///
/// A failed narration falls back to the direct text: the renderer is told to
/// drop what it already showed and receives the direct text instead.
#[instrument(skip(llm, results, tx), fields(calls = results.len()))]
pub async fn synthesize(
    llm: &LlmClient,
    policy: SynthesisPolicy,
    results: &[DispatchResult],
    tx: &mpsc::Sender<StreamEvent>,
) -> String {
    if should_narrate(policy, results) {
        match narrate(llm, results, tx).await {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => {
                warn!("Narration was empty, using templated reply");
                let _ = tx.send(StreamEvent::Discard).await;
            }
            Err(e) => {
                warn!(error = %e, "Narration failed, using templated reply");
                let _ = tx.send(StreamEvent::Discard).await;
            }
        }
    }

    let text = direct_text(results);
    let _ = tx.send(StreamEvent::Token(text.clone())).await;
    text
}

async fn narrate(
    llm: &LlmClient,
    results: &[DispatchResult],
    tx: &mpsc::Sender<StreamEvent>,
) -> LlmResult<String> {
    let prompt = narration_prompt(results);
    debug!(prompt_len = prompt.len(), "Requesting narration");

    let messages = vec![
        ChatMessage::system(NARRATION_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ];
    let mut stream = llm.chat_stream(messages, None).await?;

    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        for delta in chunk?.deltas() {
            if let StreamDelta::Text(token) = delta {
                text.push_str(&token);
                let _ = tx.send(StreamEvent::Token(token)).await;
            }
        }
    }

    Ok(text)
}
