//! Mapping from stream-json messages to hook events.

use headless_agents_core::{HookEvent, TranscriptEntry};

use crate::claude::types::{ContentItem, StreamMessage};

/// Hook events implied by one stream-json message, in content order.
#[must_use]
pub fn translate(message: &StreamMessage) -> Vec<HookEvent> {
    match message {
        StreamMessage::Assistant { message } => message
            .content
            .iter()
            .filter_map(|item| match item {
                ContentItem::ToolUse { name, input, .. } => Some(HookEvent::PreTool {
                    tool_name: name.clone(),
                    tool_input: input.clone(),
                }),
                _ => None,
            })
            .collect(),
        StreamMessage::User { message } => message
            .content
            .iter()
            .filter(|item| matches!(item, ContentItem::ToolResult {}))
            .map(|_| HookEvent::PostTool {})
            .collect(),
        // Not truncated: stream-json results are already reasonably sized.
        StreamMessage::Result(result) => vec![HookEvent::Stop {
            message: result.result.clone().unwrap_or_default(),
        }],
        StreamMessage::Unknown => Vec::new(),
    }
}

/// Hook events implied by a parsed transcript entry.
#[must_use]
pub fn translate_entry(entry: &TranscriptEntry) -> Vec<HookEvent> {
    StreamMessage::from_entry(entry)
        .map(|message| translate(&message))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn events(line: &str) -> Vec<HookEvent> {
        translate_entry(&TranscriptEntry::parse_line(line.as_bytes()).unwrap())
    }

    #[test]
    fn test_tool_use_items_become_pre_tool_in_order() {
        let events = events(
            r#"{"type":"assistant","message":{"content":[
                {"type":"text","text":"Editing now"},
                {"type":"tool_use","name":"Read","input":{"path":"a.rs"}},
                {"type":"tool_use","name":"Edit","input":{"path":"a.rs","old":"x","new":"y"}}
            ]}}"#,
        );
        assert_eq!(
            events,
            vec![
                HookEvent::PreTool {
                    tool_name: "Read".to_string(),
                    tool_input: json!({"path": "a.rs"}),
                },
                HookEvent::PreTool {
                    tool_name: "Edit".to_string(),
                    tool_input: json!({"path": "a.rs", "old": "x", "new": "y"}),
                },
            ]
        );
    }

    #[test]
    fn test_assistant_text_only_yields_nothing() {
        assert!(events(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}"#).is_empty());
    }

    #[test]
    fn test_tool_results_become_post_tool() {
        let events = events(
            r#"{"type":"user","message":{"content":[
                {"type":"tool_result","tool_use_id":"t1"},
                {"type":"tool_result","tool_use_id":"t2"}
            ]}}"#,
        );
        assert_eq!(events, vec![HookEvent::PostTool {}, HookEvent::PostTool {}]);
    }

    #[test]
    fn test_result_becomes_verbatim_stop() {
        let long = "x".repeat(2000);
        let line = json!({"type": "result", "result": long, "cost_usd": 0.02, "duration_ms": 5000});
        let events = events(&line.to_string());
        assert_eq!(events, vec![HookEvent::Stop { message: long }]);
    }

    #[test]
    fn test_result_with_odd_side_fields_still_stops() {
        let done = vec![HookEvent::Stop {
            message: "done".to_string(),
        }];
        assert_eq!(events(r#"{"type":"result","result":"done","duration_ms":1234.5}"#), done);
        assert_eq!(events(r#"{"type":"result","result":"done","is_error":null}"#), done);
        assert_eq!(
            events(r#"{"type":"result","result":null}"#),
            vec![HookEvent::Stop {
                message: String::new()
            }]
        );
    }

    #[test]
    fn test_tool_use_with_numeric_id_still_pre_tool() {
        let events = events(
            r#"{"type":"assistant","message":{"content":[
                {"type":"tool_use","id":7,"name":"Bash","input":{"command":"ls"}},
                {"type":"tool_use","id":"t2","name":"Read","input":{"path":"a.rs"}}
            ]}}"#,
        );
        let names: Vec<_> = events
            .iter()
            .map(|e| match e {
                HookEvent::PreTool { tool_name, .. } => tool_name.as_str(),
                other => panic!("Unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(names, ["Bash", "Read"]);
    }

    #[test]
    fn test_tool_result_with_numeric_id_still_post_tool() {
        assert_eq!(
            events(r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":3}]}}"#),
            vec![HookEvent::PostTool {}]
        );
    }

    #[test]
    fn test_unknown_kinds_and_odd_shapes_yield_nothing() {
        assert!(events(r#"{"type":"system","subtype":"init"}"#).is_empty());
        assert!(events(r#"{"no_type":true}"#).is_empty());
        assert!(events(r#"{"type":"assistant","message":{"content":42}}"#).is_empty());
    }
}
