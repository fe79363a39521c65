use std::time::Duration;

use headless_agents_core::{OutputKind, TranscriptEntry};

use super::{AdapterEvent, OutputAdapter};
use crate::translator::translate_entry;

/// Line-delimited JSON adapter.
///
/// Buffers raw bytes until a `\n` arrives, so neither a line nor a
/// multi-byte character split across chunks is ever parsed in pieces.
#[derive(Debug, Default)]
pub struct StreamJsonAdapter {
    pending: Vec<u8>,
}

impl StreamJsonAdapter {
    /// Create an adapter with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet terminated by a newline.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    fn process_line(line: &[u8], events: &mut Vec<AdapterEvent>) {
        let line = line.trim_ascii();
        if line.is_empty() {
            return;
        }
        match TranscriptEntry::parse_line(line) {
            Ok(entry) => {
                events.extend(translate_entry(&entry).into_iter().map(AdapterEvent::Hook));
                events.push(AdapterEvent::Entry(entry));
            }
            Err(e) => {
                tracing::debug!(len = line.len(), "Discarding malformed stream-json line: {e}");
            }
        }
    }
}

impl OutputAdapter for StreamJsonAdapter {
    fn kind(&self) -> OutputKind {
        OutputKind::StreamJson
    }

    fn on_stdout(&mut self, chunk: &[u8]) -> Vec<AdapterEvent> {
        // Earlier bytes were already scanned and hold no newline.
        let mut search_from = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.pending[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            Self::process_line(&self.pending[consumed..end], &mut events);
            consumed = end + 1;
            search_from = consumed;
        }
        self.pending.drain(..consumed);
        events
    }

    fn on_close(&mut self, _elapsed: Duration) -> Vec<AdapterEvent> {
        let mut events = Vec::new();
        let remainder = std::mem::take(&mut self.pending);
        // A fragment cut off mid-write fails to parse and is dropped.
        Self::process_line(&remainder, &mut events);
        events
    }
}
