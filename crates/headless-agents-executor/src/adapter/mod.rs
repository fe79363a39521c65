//! Output adapters: per-session state machines turning raw output chunks
//! into hook events and transcript entries.

mod stream_json;
mod text;

use std::time::Duration;

use headless_agents_core::{HookEvent, OutputKind, TranscriptEntry};

pub use stream_json::StreamJsonAdapter;
pub use text::{TEXT_MODE_NOTICE, TextAdapter};

/// One unit produced by an adapter, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// Forward to the host notification sink.
    Hook(HookEvent),
    /// Append to the transcript.
    Entry(TranscriptEntry),
}

/// Capability shared by every output mode.
pub trait OutputAdapter: Send {
    /// Output kind this adapter handles.
    fn kind(&self) -> OutputKind;

    /// Called once when the session starts.
    fn on_start(&mut self) -> Vec<AdapterEvent> {
        Vec::new()
    }

    /// Consume one stdout chunk.
    fn on_stdout(&mut self, chunk: &[u8]) -> Vec<AdapterEvent>;

    /// Consume one stderr chunk. Forwarded verbatim, never buffered.
    fn on_stderr(&mut self, chunk: &[u8]) -> Vec<AdapterEvent> {
        vec![AdapterEvent::Hook(HookEvent::notification(
            String::from_utf8_lossy(chunk),
        ))]
    }

    /// Flush buffered state when the process has closed.
    fn on_close(&mut self, elapsed: Duration) -> Vec<AdapterEvent>;
}

/// Adapter for the given output kind.
#[must_use]
pub fn adapter_for(kind: OutputKind) -> Box<dyn OutputAdapter> {
    match kind {
        OutputKind::StreamJson => Box::new(StreamJsonAdapter::new()),
        OutputKind::Text => Box::new(TextAdapter::new()),
    }
}
