//! Canonical hook events surfaced to the host UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum length, in characters, of a `stop` message synthesized from plain text.
pub const STOP_MESSAGE_MAX_CHARS: usize = 500;

/// UI-facing activity signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookEvent {
    /// The agent is about to invoke a tool.
    #[serde(rename_all = "camelCase")]
    PreTool { tool_name: String, tool_input: Value },
    /// A tool invocation finished.
    PostTool {},
    /// The agent finished its run.
    Stop { message: String },
    /// Free-form information for the host.
    Notification { message: String },
}

impl HookEvent {
    /// Create a notification event.
    #[must_use]
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    /// Create a stop event whose message is capped at [`STOP_MESSAGE_MAX_CHARS`].
    #[must_use]
    pub fn truncated_stop(message: &str) -> Self {
        Self::Stop {
            message: truncate_chars(message, STOP_MESSAGE_MAX_CHARS).to_string(),
        }
    }

    /// Snake-case name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PreTool { .. } => "pre_tool",
            Self::PostTool {} => "post_tool",
            Self::Stop { .. } => "stop",
            Self::Notification { .. } => "notification",
        }
    }
}

/// Longest prefix of `s` holding at most `max` characters.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
