// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! One-line JSONL event decoding.
//!
//! The harness appends one JSON object per line to the live log.  Decoding is
//! deliberately lenient: blank lines, malformed JSON, unknown event kinds and
//! unknown content-block types are all dropped without surfacing an error, so
//! a harness upgrade can add fields without breaking the monitor.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// The `type` field of a wire event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    User,
    Assistant,
    ToolUse,
    ToolResult,
    System,
    Result,
}

impl EventKind {
    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "user" => Some(EventKind::User),
            "assistant" => Some(EventKind::Assistant),
            "tool_use" => Some(EventKind::ToolUse),
            "tool_result" => Some(EventKind::ToolResult),
            "system" => Some(EventKind::System),
            "result" => Some(EventKind::Result),
            _ => None,
        }
    }
}

/// One block of a message payload.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        /// `None` for an explicit JSON null.
        content: Option<String>,
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn is_tool_result(&self) -> bool {
        matches!(self, ContentBlock::ToolResult { .. })
    }
}

/// Token usage attached to an assistant message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read: u64,
    pub cache_creation: u64,
}

/// A decoded JSONL line.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub kind: EventKind,
    pub content: Vec<ContentBlock>,
    pub usage: Option<Usage>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Non-empty when the event belongs to the subagent spawned by that tool.
    pub parent_tool_use_id: Option<String>,
    pub session_id: Option<String>,
}

/// Decode one line of the live log.  Returns `None` for anything that is not
/// a recognisable event.
pub fn parse_line(line: &str) -> Option<RawEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(line).ok()?;
    let kind = EventKind::from_wire(value.get("type")?.as_str()?)?;

    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let parent_tool_use_id = value
        .get("parent_tool_use_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let session_id = value
        .get("session_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut content = Vec::new();
    if let Some(blocks) = value.pointer("/message/content").and_then(Value::as_array) {
        for block in blocks {
            if let Some(parsed) = parse_block(block) {
                content.push(parsed);
            }
        }
    } else if kind == EventKind::ToolResult {
        // Bare tool_result events carry their fields at the top level; lift
        // them into a synthetic one-block content array so the matcher has a
        // single code path.
        if let Some(id) = value.get("tool_use_id").and_then(Value::as_str) {
            content.push(ContentBlock::ToolResult {
                tool_use_id: id.to_string(),
                content: result_content(value.get("content")),
                is_error: value
                    .get("is_error")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            });
        }
    }

    let usage = value.pointer("/message/usage").and_then(parse_usage);

    Some(RawEvent {
        kind,
        content,
        usage,
        timestamp,
        parent_tool_use_id,
        session_id,
    })
}

fn parse_block(block: &Value) -> Option<ContentBlock> {
    match block.get("type")?.as_str()? {
        "text" => Some(ContentBlock::Text {
            text: block.get("text")?.as_str()?.to_string(),
        }),
        "tool_use" => Some(ContentBlock::ToolUse {
            id: block.get("id")?.as_str()?.to_string(),
            name: block.get("name")?.as_str()?.to_string(),
            input: block.get("input").cloned().unwrap_or(Value::Null),
        }),
        "tool_result" => Some(ContentBlock::ToolResult {
            tool_use_id: block.get("tool_use_id")?.as_str()?.to_string(),
            content: result_content(block.get("content")),
            is_error: block
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }),
        _ => None,
    }
}

/// String form of a tool-result `content` field: the string itself, `None`
/// for null/absent, and compact JSON for anything structured.
fn result_content(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn parse_usage(value: &Value) -> Option<Usage> {
    let field = |name: &str| value.get(name).and_then(Value::as_u64).unwrap_or(0);
    value.as_object()?;
    Some(Usage {
        input_tokens: field("input_tokens"),
        output_tokens: field("output_tokens"),
        cache_read: field("cache_read_input_tokens"),
        cache_creation: field("cache_creation_input_tokens"),
    })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_dropped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   \t ").is_none());
    }

    #[test]
    fn malformed_json_is_dropped() {
        assert!(parse_line("{not json").is_none());
        assert!(parse_line("[1,2,3]").is_none());
    }

    #[test]
    fn unknown_kind_is_dropped() {
        assert!(parse_line(r#"{"type":"telemetry"}"#).is_none());
    }

    #[test]
    fn text_message_decodes() {
        let ev = parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}"#,
        )
        .unwrap();
        assert_eq!(ev.kind, EventKind::Assistant);
        assert!(matches!(&ev.content[0], ContentBlock::Text { text } if text == "hi"));
    }

    #[test]
    fn tool_use_block_decodes_with_input() {
        let ev = parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{"path":"/a"}}]}}"#,
        )
        .unwrap();
        match &ev.content[0] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "t1");
                assert_eq!(name, "Read");
                assert_eq!(input["path"], "/a");
            }
            other => panic!("expected tool_use, got {other:?}"),
        }
    }

    #[test]
    fn tool_result_block_decodes() {
        let ev = parse_line(
            r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":"ok","is_error":false}]}}"#,
        )
        .unwrap();
        match &ev.content[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "t1");
                assert_eq!(content.as_deref(), Some("ok"));
                assert!(!is_error);
            }
            other => panic!("expected tool_result, got {other:?}"),
        }
    }

    #[test]
    fn null_result_content_is_none() {
        let ev = parse_line(
            r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":null,"is_error":true}]}}"#,
        )
        .unwrap();
        match &ev.content[0] {
            ContentBlock::ToolResult { content, is_error, .. } => {
                assert!(content.is_none());
                assert!(is_error);
            }
            other => panic!("expected tool_result, got {other:?}"),
        }
    }

    #[test]
    fn bare_tool_result_event_is_lifted_into_content() {
        let ev = parse_line(
            r#"{"type":"tool_result","tool_use_id":"t9","content":"done","is_error":false}"#,
        )
        .unwrap();
        assert_eq!(ev.kind, EventKind::ToolResult);
        assert_eq!(ev.content.len(), 1);
        assert!(matches!(
            &ev.content[0],
            ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id == "t9"
        ));
    }

    #[test]
    fn unknown_block_types_are_skipped() {
        let ev = parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"t"}]}}"#,
        )
        .unwrap();
        assert_eq!(ev.content.len(), 1);
    }

    #[test]
    fn timestamp_parses_iso8601() {
        let ev = parse_line(
            r#"{"type":"user","timestamp":"2026-03-01T10:20:30.456Z","message":{"content":[]}}"#,
        )
        .unwrap();
        let ts = ev.timestamp.unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T10:20:30.456+00:00");
    }

    #[test]
    fn bad_timestamp_is_tolerated() {
        let ev = parse_line(
            r#"{"type":"user","timestamp":"yesterday","message":{"content":[]}}"#,
        )
        .unwrap();
        assert!(ev.timestamp.is_none());
    }

    #[test]
    fn empty_parent_tool_use_id_reads_as_main() {
        let ev = parse_line(r#"{"type":"user","parent_tool_use_id":"","message":{"content":[]}}"#)
            .unwrap();
        assert!(ev.parent_tool_use_id.is_none());
    }

    #[test]
    fn parent_tool_use_id_marks_subagent() {
        let ev = parse_line(
            r#"{"type":"assistant","parent_tool_use_id":"ta","message":{"content":[]}}"#,
        )
        .unwrap();
        assert_eq!(ev.parent_tool_use_id.as_deref(), Some("ta"));
    }

    #[test]
    fn usage_decodes_with_cache_fields() {
        let ev = parse_line(
            r#"{"type":"assistant","message":{"content":[],"usage":{"input_tokens":100,"output_tokens":20,"cache_read_input_tokens":50,"cache_creation_input_tokens":5}}}"#,
        )
        .unwrap();
        let u = ev.usage.unwrap();
        assert_eq!(u.input_tokens, 100);
        assert_eq!(u.output_tokens, 20);
        assert_eq!(u.cache_read, 50);
        assert_eq!(u.cache_creation, 5);
    }

    #[test]
    fn session_id_is_passed_through() {
        let ev = parse_line(
            r#"{"type":"system","session_id":"sess-1","message":{"content":[]}}"#,
        )
        .unwrap();
        assert_eq!(ev.session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn structured_result_content_becomes_compact_json() {
        let ev = parse_line(
            r#"{"type":"tool_result","tool_use_id":"t1","content":[{"type":"text","text":"x"}]}"#,
        )
        .unwrap();
        match &ev.content[0] {
            ContentBlock::ToolResult { content, .. } => {
                assert!(content.as_deref().unwrap().contains("\"text\":\"x\""));
            }
            other => panic!("expected tool_result, got {other:?}"),
        }
    }
}
