// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};

use crate::conversation::Conversation;

/// Accumulated token usage.  `input` folds cache reads and cache creation in
/// (they are billed as input); the cache counters are also kept separately so
/// the stats view can show the cache hit share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_creation: u64,
}

/// Aggregate statistics over a slice of the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total_tokens: TokenTotals,
    pub tool_call_count: usize,
    pub message_count: usize,
    pub error_count: usize,
    pub subagent_count: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Compute stats over the messages at `start_index` and later (the
    /// current session), or the whole list when no boundary is set.
    pub fn compute(conversation: &Conversation, start_index: Option<usize>) -> Self {
        let messages = conversation.messages();
        let start = start_index.unwrap_or(0).min(messages.len());
        let slice = &messages[start..];

        let mut stats = SessionStats {
            message_count: slice.len(),
            ..SessionStats::default()
        };
        for message in slice {
            if let Some(usage) = &message.usage {
                stats.total_tokens.input +=
                    usage.input_tokens + usage.cache_read + usage.cache_creation;
                stats.total_tokens.output += usage.output_tokens;
                stats.total_tokens.cache_read += usage.cache_read;
                stats.total_tokens.cache_creation += usage.cache_creation;
            }
            for call in conversation.tools_of(message) {
                stats.tool_call_count += 1;
                if call.is_subagent {
                    stats.subagent_count += 1;
                }
                if call.is_error == Some(true) {
                    stats.error_count += 1;
                }
            }
        }
        stats.start_time = slice.first().map(|m| m.timestamp);
        stats.end_time = slice.last().map(|m| m.timestamp);
        stats
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(conv: &mut Conversation, lines: &[&str]) {
        for line in lines {
            conv.apply_line(line);
        }
    }

    #[test]
    fn empty_conversation_yields_zeroes() {
        let conv = Conversation::new();
        let stats = SessionStats::compute(&conv, None);
        assert_eq!(stats, SessionStats::default());
        assert!(stats.start_time.is_none());
        assert!(stats.end_time.is_none());
    }

    #[test]
    fn cache_tokens_count_inside_input_and_separately() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}],"usage":{"input_tokens":100,"output_tokens":10,"cache_read_input_tokens":40,"cache_creation_input_tokens":5}}}"#],
        );
        let stats = SessionStats::compute(&conv, None);
        assert_eq!(stats.total_tokens.input, 145);
        assert_eq!(stats.total_tokens.output, 10);
        assert_eq!(stats.total_tokens.cache_read, 40);
        assert_eq!(stats.total_tokens.cache_creation, 5);
    }

    #[test]
    fn tool_subagent_and_error_counts() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{}},{"type":"tool_use","id":"ta","name":"Task","input":{}}]}}"#,
                r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t1","content":"no","is_error":true}]}}"#,
            ],
        );
        let stats = SessionStats::compute(&conv, None);
        assert_eq!(stats.tool_call_count, 2);
        assert_eq!(stats.subagent_count, 1);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.message_count, 1);
    }

    #[test]
    fn boundary_limits_the_slice() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[
                r#"{"type":"user","timestamp":"2026-03-01T09:00:00Z","message":{"content":[{"type":"text","text":"old"}]}}"#,
                r#"{"type":"user","timestamp":"2026-03-01T10:00:00Z","message":{"content":[{"type":"text","text":"new"}]}}"#,
            ],
        );
        let stats = SessionStats::compute(&conv, Some(1));
        assert_eq!(stats.message_count, 1);
        assert_eq!(
            stats.start_time.unwrap().to_rfc3339(),
            "2026-03-01T10:00:00+00:00"
        );
        assert_eq!(stats.start_time, stats.end_time);
    }

    #[test]
    fn boundary_past_the_end_is_empty() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[r#"{"type":"user","message":{"content":[{"type":"text","text":"x"}]}}"#],
        );
        let stats = SessionStats::compute(&conv, Some(10));
        assert_eq!(stats.message_count, 0);
    }
}
