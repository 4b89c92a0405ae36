//! Cadence chat library
//!
//! The tool registry, tool-call reassembly, dispatch, result synthesis and
//! the chat session behind the `cadence` binary, exposed for integration
//! tests.

pub mod error;
pub mod services;
pub mod tools;

// Re-export commonly used types
pub use error::{ChatError, ChatResult, ToolError, NO_ACTIVE_DEVICE_MESSAGE};
pub use services::{ChatSession, StreamEvent};
pub use tools::{all_schemas, entry_for, Operation, OperationOutput, ToolSchema};
