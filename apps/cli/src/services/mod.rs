//! Turn processing services

pub mod accumulator;
pub mod chat;
pub mod dispatch;
pub mod synthesis;

pub use accumulator::{StreamAccumulator, ToolCallFragment};
pub use chat::{ChatSession, StreamEvent, EMPTY_REPLY, GREETING, STREAM_CHANNEL_CAPACITY};
pub use dispatch::{DispatchResult, Dispatcher};
