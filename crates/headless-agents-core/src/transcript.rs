//! Transcript entries and the append-only in-memory transcript store.

use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Capacity of the live broadcast channel. Lagging subscribers skip entries.
const LIVE_CAPACITY: usize = 1024;

/// Transcript entry error.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Transcript entry must be a JSON object")]
    NotAnObject,
}

/// One durable record of agent activity.
///
/// Always a JSON object. Kinds other than `assistant`, `user` and `result`
/// are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct TranscriptEntry(Value);

impl TranscriptEntry {
    /// Parse one output line.
    ///
    /// # Errors
    /// Returns error if the line is not a JSON object.
    pub fn parse_line(line: &[u8]) -> Result<Self, TranscriptError> {
        let value: Value = serde_json::from_slice(line)?;
        Self::try_from(value)
    }

    /// Build the `result` entry standing in for a plain-text run.
    #[must_use]
    pub fn synthesized_result(text: impl Into<String>, duration_ms: u64) -> Self {
        Self(json!({
            "type": "result",
            "result": text.into(),
            "cost_usd": 0,
            "duration_ms": duration_ms,
        }))
    }

    /// The entry's `type` field.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

impl TryFrom<Value> for TranscriptEntry {
    type Error = TranscriptError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(TranscriptError::NotAnObject)
        }
    }
}

impl From<TranscriptEntry> for Value {
    fn from(entry: TranscriptEntry) -> Self {
        entry.0
    }
}

impl fmt::Display for TranscriptEntry {
    /// Compact single-line JSON, the on-disk log format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary derived from the most recent `result` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub summary: String,
    pub cost_usd: f64,
    pub duration_ms: u64,
}

/// Append-only transcript with broadcast support.
///
/// Readers get a consistent snapshot; subscribers receive the history
/// followed by live entries until the store is sealed.
pub struct TranscriptStore {
    entries: RwLock<Vec<TranscriptEntry>>,
    sender: RwLock<Option<broadcast::Sender<TranscriptEntry>>>,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStore {
    /// Create an empty transcript store.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            entries: RwLock::new(Vec::with_capacity(32)),
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Append an entry to history and to live subscribers.
    pub fn push(&self, entry: TranscriptEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = self
            .sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = sender.send(entry.clone()); // no subscribers is fine
        }
        entries.push(entry);
    }

    /// Stop broadcasting; live streams end after draining.
    pub fn seal(&self) {
        let _entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Number of entries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no entry has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every entry so far.
    #[must_use]
    pub fn get_history(&self) -> Vec<TranscriptEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent entry of the given kind.
    #[must_use]
    pub fn last_of_kind(&self, kind: &str) -> Option<TranscriptEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|entry| entry.kind() == Some(kind))
            .cloned()
    }

    /// Entries serialized one per line, without a trailing newline.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Stream that yields history first, then live entries.
    #[must_use]
    pub fn history_plus_stream(&self) -> futures::stream::BoxStream<'static, TranscriptEntry> {
        // Subscribing under the read lock keeps history and live disjoint.
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let history = entries.clone();
        let receiver = self
            .sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(broadcast::Sender::subscribe);
        drop(entries);

        let hist = futures::stream::iter(history);
        match receiver {
            Some(rx) => {
                let live = BroadcastStream::new(rx).filter_map(|res| async move {
                    if let Err(e) = &res {
                        tracing::warn!("Transcript subscriber lagged: {e}");
                    }
                    res.ok()
                });
                hist.chain(live).boxed()
            }
            None => hist.boxed(),
        }
    }
}
