//! Dispatch of reassembled tool calls to operations
//!
//! Calls run strictly one after another in index order. A call that fails
//! (bad arguments, unknown name, Spotify error) produces an error outcome
//! and the remaining calls still run. Nothing is retried or rolled back.

use std::sync::Arc;

use cadence_spotify_client::MusicService;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::accumulator::ToolCallFragment;
use crate::error::ToolError;
use crate::tools::{entry_for, Operation, OperationOutput};

/// Outcome of one dispatched call
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    /// Stream-assigned index of the call
    pub index: u32,
    /// Name as supplied by the model
    pub operation_name: String,
    /// Resolved operation, if the name was known
    pub operation: Option<Operation>,
    /// Operation description, or the raw name for unknown operations
    pub description: String,
    /// Parsed argument object, or the raw text if it did not parse
    pub arguments: Value,
    pub outcome: Result<Option<OperationOutput>, ToolError>,
}

impl DispatchResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Templated user-facing text; `None` when the call had nothing to say
    pub fn rendered(&self) -> Option<String> {
        match (&self.outcome, self.operation) {
            (Ok(Some(output)), Some(operation)) => Some(output.render(operation)),
            (Ok(Some(output)), None) => Some(output.details()),
            (Ok(None), _) => None,
            (Err(err), _) => Some(err.to_string()),
        }
    }

    /// Untemplated result text for the narration prompt
    pub fn details(&self) -> Option<String> {
        match &self.outcome {
            Ok(Some(output)) => Some(output.details()),
            Ok(None) => None,
            Err(err) => Some(err.to_string()),
        }
    }
}

/// Parse argument text into an object; blank text is an empty object
fn parse_arguments(name: &str, raw: &str) -> Result<Map<String, Value>, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ToolError::malformed(
            name,
            format!("arguments must be a JSON object, got {}", other),
        )),
        Err(e) => Err(ToolError::malformed(
            name,
            format!("arguments are not valid JSON: {}", e),
        )),
    }
}

/// Runs tool calls against a music service
#[derive(Clone)]
pub struct Dispatcher {
    music: Arc<dyn MusicService>,
}

impl Dispatcher {
    pub fn new(music: Arc<dyn MusicService>) -> Self {
        Self { music }
    }

    /// Dispatch every call in index order
    pub async fn dispatch(&self, calls: Vec<ToolCallFragment>) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.dispatch_one(call).await);
        }
        results
    }

    /// Dispatch a single call
    #[instrument(skip(self, call), fields(index = call.index, operation = %call.name))]
    pub async fn dispatch_one(&self, call: ToolCallFragment) -> DispatchResult {
        let ToolCallFragment {
            index,
            name,
            arguments: raw_arguments,
        } = call;

        let (operation, description, arguments, outcome) =
            match parse_arguments(&name, &raw_arguments) {
                Err(err) => {
                    let operation = Operation::from_name(&name);
                    let description = operation
                        .map(|op| op.description().to_string())
                        .unwrap_or_else(|| name.clone());
                    (operation, description, Value::String(raw_arguments), Err(err))
                }
                Ok(arguments) => match entry_for(&name) {
                    Err(err) => (None, name.clone(), Value::Object(arguments), Err(err)),
                    Ok(operation) => {
                        let shown = Value::Object(arguments.clone());
                        debug!(arguments = %shown, "Invoking operation");
                        let outcome = operation.invoke(self.music.as_ref(), &arguments).await;
                        (
                            Some(operation),
                            operation.description().to_string(),
                            Value::Object(arguments),
                            outcome,
                        )
                    }
                },
            };

        match &outcome {
            Ok(_) => info!("Operation completed"),
            Err(err) => warn!(error = %err, "Operation failed"),
        }

        DispatchResult {
            index,
            operation_name: name,
            operation,
            description,
            arguments,
            outcome,
        }
    }
}
