use std::time::Duration;

use headless_agents_core::{HookEvent, OutputKind, TranscriptEntry};

use super::{AdapterEvent, OutputAdapter};

/// Notice sent when a session starts in text mode.
pub const TEXT_MODE_NOTICE: &str =
    "Agent output is plain text; step-by-step tool activity is unavailable for this run.";

/// Free-form text adapter. Accumulates everything and reports once at close.
#[derive(Debug, Default)]
pub struct TextAdapter {
    accumulated: Vec<u8>,
}

impl TextAdapter {
    /// Create an adapter with an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputAdapter for TextAdapter {
    fn kind(&self) -> OutputKind {
        OutputKind::Text
    }

    fn on_start(&mut self) -> Vec<AdapterEvent> {
        vec![AdapterEvent::Hook(HookEvent::notification(TEXT_MODE_NOTICE))]
    }

    fn on_stdout(&mut self, chunk: &[u8]) -> Vec<AdapterEvent> {
        self.accumulated.extend_from_slice(chunk);
        Vec::new()
    }

    fn on_close(&mut self, elapsed: Duration) -> Vec<AdapterEvent> {
        if self.accumulated.is_empty() {
            return Vec::new();
        }
        let bytes = std::mem::take(&mut self.accumulated);
        let text = String::from_utf8_lossy(&bytes);
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        vec![
            AdapterEvent::Entry(TranscriptEntry::synthesized_result(&*text, duration_ms)),
            AdapterEvent::Hook(HookEvent::truncated_stop(&text)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use headless_agents_core::hook::STOP_MESSAGE_MAX_CHARS;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_start_emits_notice() {
        let mut adapter = TextAdapter::new();
        assert_eq!(
            adapter.on_start(),
            vec![AdapterEvent::Hook(HookEvent::notification(TEXT_MODE_NOTICE))]
        );
    }

    #[test]
    fn test_nothing_before_close_then_one_result() {
        let mut adapter = TextAdapter::new();
        assert!(adapter.on_stdout(b"partial ").is_empty());
        assert!(adapter.on_stdout(b"{\"type\":\"result\"}\n").is_empty());
        assert!(adapter.on_stdout(b"output").is_empty());

        let events = adapter.on_close(Duration::from_millis(1500));
        let text = "partial {\"type\":\"result\"}\noutput";
        assert_eq!(
            events,
            vec![
                AdapterEvent::Entry(
                    TranscriptEntry::try_from(json!({
                        "type": "result",
                        "result": text,
                        "cost_usd": 0,
                        "duration_ms": 1500
                    }))
                    .unwrap()
                ),
                AdapterEvent::Hook(HookEvent::Stop {
                    message: text.to_string()
                }),
            ]
        );
    }

    #[test]
    fn test_empty_output_produces_nothing() {
        let mut adapter = TextAdapter::new();
        assert!(adapter.on_close(Duration::from_secs(3)).is_empty());
    }

    #[test]
    fn test_stop_message_truncated_but_entry_is_not() {
        let mut adapter = TextAdapter::new();
        let long = "0123456789".repeat(120);
        adapter.on_stdout(long.as_bytes());

        let events = adapter.on_close(Duration::ZERO);
        let [AdapterEvent::Entry(entry), AdapterEvent::Hook(HookEvent::Stop { message })] =
            events.as_slice()
        else {
            panic!("Unexpected events: {events:?}");
        };
        assert_eq!(message.chars().count(), STOP_MESSAGE_MAX_CHARS);
        assert_eq!(entry.as_value()["result"], long.as_str());
    }
}
