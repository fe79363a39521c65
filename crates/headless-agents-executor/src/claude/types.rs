//! Stream-json wire types emitted by the Claude Code CLI.
//!
//! Only the fields needed to classify hook events and summarize a run are
//! modelled; everything else stays in the raw transcript entry. Modelled
//! fields are decoded leniently: a value of an unexpected type reads as
//! absent instead of rejecting the whole message.

use headless_agents_core::TranscriptEntry;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

/// One line of `--output-format stream-json` output.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Assistant {
        #[serde(default, deserialize_with = "lenient_or_default")]
        message: MessageBody,
    },
    User {
        #[serde(default, deserialize_with = "lenient_or_default")]
        message: MessageBody,
    },
    Result(ResultMessage),
    /// `system` and any kind added by future CLI versions.
    #[serde(other)]
    Unknown,
}

impl StreamMessage {
    /// Typed view of a transcript entry, if its shape is recognized.
    #[must_use]
    pub fn from_entry(entry: &TranscriptEntry) -> Option<Self> {
        match Self::deserialize(entry.as_value()) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(kind = ?entry.kind(), "Unrecognized stream message shape: {e}");
                None
            }
        }
    }
}

/// Assistant or user message payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    /// Content blocks. Plain-text content (simple user turns) has none.
    #[serde(default, deserialize_with = "content_items")]
    pub content: Vec<ContentItem>,
}

/// One content block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        #[serde(default, deserialize_with = "lenient_or_default")]
        text: String,
    },
    ToolUse {
        #[serde(default, deserialize_with = "lenient_or_default")]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {},
    #[serde(other)]
    Other,
}

/// Final `result` line of a run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultMessage {
    #[serde(default, deserialize_with = "lenient")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cost_usd: Option<f64>,
    /// Newer CLI versions report cost under this name.
    #[serde(default, deserialize_with = "lenient")]
    pub total_cost_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    duration_ms: Option<f64>,
}

impl ResultMessage {
    /// Parse a `result` transcript entry.
    #[must_use]
    pub fn from_entry(entry: &TranscriptEntry) -> Option<Self> {
        match StreamMessage::from_entry(entry)? {
            StreamMessage::Result(result) => Some(result),
            _ => None,
        }
    }

    /// Reported cost in USD, zero if absent.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost_usd.or(self.total_cost_usd).unwrap_or_default()
    }

    /// Reported duration in whole milliseconds, zero if absent or negative.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
            .filter(|ms| ms.is_finite())
            .map_or(0, |ms| ms.max(0.0).round() as u64)
    }
}

/// `Some` if the value decodes as `T`, `None` for anything else.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Items are decoded one by one so a malformed block cannot hide its siblings.
fn content_items<'de, D>(deserializer: D) -> Result<Vec<ContentItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or(ContentItem::Other))
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> StreamMessage {
        let entry = TranscriptEntry::parse_line(line.as_bytes()).unwrap();
        StreamMessage::from_entry(&entry).unwrap()
    }

    fn parse_result(line: &str) -> ResultMessage {
        let StreamMessage::Result(result) = parse(line) else {
            panic!("Wrong message type");
        };
        result
    }

    #[test]
    fn test_parse_tool_use() {
        let msg = parse(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Edit","input":{"path":"a.rs"}}]}}"#,
        );
        let StreamMessage::Assistant { message } = msg else {
            panic!("Wrong message type");
        };
        let [ContentItem::ToolUse { name, input }] = message.content.as_slice() else {
            panic!("Wrong content");
        };
        assert_eq!(name, "Edit");
        assert_eq!(input["path"], "a.rs");
    }

    #[test]
    fn test_user_text_content() {
        let msg = parse(r#"{"type":"user","message":{"content":"fix the bug"}}"#);
        let StreamMessage::User { message } = msg else {
            panic!("Wrong message type");
        };
        assert!(message.content.is_empty());
    }

    #[test]
    fn test_unknown_kinds_and_items() {
        assert!(matches!(
            parse(r#"{"type":"system","subtype":"init"}"#),
            StreamMessage::Unknown
        ));
        let msg = parse(
            r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"..."}]}}"#,
        );
        let StreamMessage::Assistant { message } = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(message.content, [ContentItem::Other]);
    }

    #[test]
    fn test_malformed_item_does_not_hide_siblings() {
        let msg = parse(
            r#"{"type":"assistant","message":{"content":[
                {"type":"tool_use","id":7,"name":"Read","input":{}},
                {"no_type":true},
                {"type":"tool_use","name":["not","a","string"]},
                {"type":"tool_result","tool_use_id":{"nested":1}}
            ]}}"#,
        );
        let StreamMessage::Assistant { message } = msg else {
            panic!("Wrong message type");
        };
        assert!(matches!(&message.content[0], ContentItem::ToolUse { name, .. } if name == "Read"));
        assert_eq!(message.content[1], ContentItem::Other);
        assert!(matches!(&message.content[2], ContentItem::ToolUse { name, .. } if name.is_empty()));
        assert_eq!(message.content[3], ContentItem::ToolResult {});
    }

    #[test]
    fn test_non_object_message_reads_as_empty() {
        let StreamMessage::Assistant { message } =
            parse(r#"{"type":"assistant","message":"oops"}"#)
        else {
            panic!("Wrong message type");
        };
        assert!(message.content.is_empty());
    }

    #[test]
    fn test_result_cost_fallback() {
        let legacy = parse_result(r#"{"type":"result","result":"ok","cost_usd":0.02,"duration_ms":5000}"#);
        assert!((legacy.cost() - 0.02).abs() < f64::EPSILON);
        assert_eq!(legacy.duration_ms(), 5000);

        let current = parse_result(r#"{"type":"result","subtype":"success","total_cost_usd":0.5}"#);
        assert!((current.cost() - 0.5).abs() < f64::EPSILON);
        assert_eq!(current.result, None);
        assert_eq!(current.duration_ms(), 0);
    }

    #[test]
    fn test_result_side_fields_of_unexpected_type() {
        let result = parse_result(
            r#"{"type":"result","result":"done","duration_ms":1234.5,"is_error":null,"session_id":9,"cost_usd":"free"}"#,
        );
        assert_eq!(result.result.as_deref(), Some("done"));
        assert_eq!(result.duration_ms(), 1235);
        assert!(result.cost().abs() < f64::EPSILON);

        let negative = parse_result(r#"{"type":"result","result":42,"duration_ms":-3}"#);
        assert_eq!(negative.result, None);
        assert_eq!(negative.duration_ms(), 0);
    }
}
