//! Core traits and shared identifiers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::HookEvent;

/// Session identifier, fresh for every spawn of an agent.
pub type SessionId = Uuid;

/// Wire-format contract of an agent binary's stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    /// Line-delimited JSON events.
    #[default]
    StreamJson,
    /// Unstructured free-form text.
    Text,
}

impl OutputKind {
    /// Wire name of this output kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StreamJson => "stream-json",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized output kind name.
#[derive(Debug, Error)]
#[error("Unknown output kind: {0} (expected `stream-json` or `text`)")]
pub struct UnknownOutputKind(pub String);

impl FromStr for OutputKind {
    type Err = UnknownOutputKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream-json" => Ok(Self::StreamJson),
            "text" => Ok(Self::Text),
            other => Err(UnknownOutputKind(other.to_string())),
        }
    }
}

/// Outbound channel from the session manager to the host.
///
/// Implementations must not block: they are called from session tasks
/// while output is being drained.
pub trait NotificationSink: Send + Sync {
    /// A hook event was produced for `agent_id`.
    fn hook_event(&self, agent_id: &str, event: HookEvent);

    /// The session for `agent_id` has been torn down.
    fn exited(&self, agent_id: &str, exit_code: i32);
}
