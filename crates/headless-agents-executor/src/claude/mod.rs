//! Claude Code CLI stream-json protocol.

pub mod types;

pub use types::{ContentItem, MessageBody, ResultMessage, StreamMessage};
