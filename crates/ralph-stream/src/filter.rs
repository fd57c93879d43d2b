// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Message filter tags.
//!
//! The tag of a message is a pure function of the message, its tool calls
//! and whether it is the session's initial prompt; nothing is cached on the
//! message itself.

use std::collections::HashMap;

use crate::conversation::{Conversation, MessageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterTag {
    InitialPrompt,
    User,
    Thinking,
    Tool,
    Assistant,
    Subagent,
    System,
    Result,
}

impl FilterTag {
    pub const ALL: [FilterTag; 8] = [
        FilterTag::InitialPrompt,
        FilterTag::User,
        FilterTag::Thinking,
        FilterTag::Tool,
        FilterTag::Assistant,
        FilterTag::Subagent,
        FilterTag::System,
        FilterTag::Result,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FilterTag::InitialPrompt => "initial-prompt",
            FilterTag::User => "user",
            FilterTag::Thinking => "thinking",
            FilterTag::Tool => "tool",
            FilterTag::Assistant => "assistant",
            FilterTag::Subagent => "subagent",
            FilterTag::System => "system",
            FilterTag::Result => "result",
        }
    }
}

/// Index of the session's initial prompt: the first non-empty user message
/// at or after the session boundary.
pub fn initial_prompt_index(
    conversation: &Conversation,
    session_start: Option<usize>,
) -> Option<usize> {
    let start = session_start.unwrap_or(0);
    conversation
        .messages()
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, m)| m.kind == MessageKind::User && !m.text.trim().is_empty())
        .map(|(ix, _)| ix)
}

/// Tag of the message at `index`.
pub fn filter_tag(
    conversation: &Conversation,
    index: usize,
    initial_prompt: Option<usize>,
) -> FilterTag {
    let message = &conversation.messages()[index];
    if initial_prompt == Some(index) {
        return FilterTag::InitialPrompt;
    }
    match message.kind {
        MessageKind::User => FilterTag::User,
        MessageKind::System => FilterTag::System,
        MessageKind::Result => FilterTag::Result,
        MessageKind::Assistant => {
            let has_text = !message.text.trim().is_empty();
            let has_tools = !message.tool_calls.is_empty();
            match (has_text, has_tools) {
                (_, false) => FilterTag::Thinking,
                (true, true) => FilterTag::Assistant,
                (false, true) => {
                    if conversation.tools_of(message).any(|c| c.is_subagent) {
                        FilterTag::Subagent
                    } else {
                        FilterTag::Tool
                    }
                }
            }
        }
    }
}

/// Per-tag message counts for the filter dialog.
pub fn filter_counts(
    conversation: &Conversation,
    session_start: Option<usize>,
) -> HashMap<FilterTag, usize> {
    let initial = initial_prompt_index(conversation, session_start);
    let mut counts = HashMap::new();
    for index in 0..conversation.messages().len() {
        *counts
            .entry(filter_tag(conversation, index, initial))
            .or_insert(0) += 1;
    }
    counts
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

    fn user(text: &str) -> String {
        format!(
            r#"{{"type":"user","message":{{"content":[{{"type":"text","text":"{text}"}}]}}}}"#
        )
    }

    #[test]
    fn first_nonempty_user_message_is_initial_prompt() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[
                r#"{"type":"system","message":{"content":[{"type":"text","text":"boot"}]}}"#,
                &user("   "),
                &user("do the thing"),
            ],
        );
        let initial = initial_prompt_index(&conv, None);
        assert_eq!(initial, Some(2));
        assert_eq!(filter_tag(&conv, 2, initial), FilterTag::InitialPrompt);
        assert_eq!(filter_tag(&conv, 1, initial), FilterTag::User);
    }

    #[test]
    fn initial_prompt_respects_session_boundary() {
        let mut conv = Conversation::new();
        feed(&mut conv, &[&user("previous session"), &user("this session")]);
        assert_eq!(initial_prompt_index(&conv, Some(1)), Some(1));
        assert_eq!(initial_prompt_index(&conv, None), Some(0));
    }

    #[test]
    fn text_only_assistant_is_thinking() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hmm"}]}}"#],
        );
        assert_eq!(filter_tag(&conv, 0, None), FilterTag::Thinking);
    }

    #[test]
    fn tools_only_assistant_is_tool() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{}}]}}"#],
        );
        assert_eq!(filter_tag(&conv, 0, None), FilterTag::Tool);
    }

    #[test]
    fn tools_only_with_task_is_subagent() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{}},{"type":"tool_use","id":"ta","name":"Task","input":{}}]}}"#],
        );
        assert_eq!(filter_tag(&conv, 0, None), FilterTag::Subagent);
    }

    #[test]
    fn text_and_tools_is_assistant() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[r#"{"type":"assistant","message":{"content":[{"type":"text","text":"running"},{"type":"tool_use","id":"t1","name":"Read","input":{}}]}}"#],
        );
        assert_eq!(filter_tag(&conv, 0, None), FilterTag::Assistant);
    }

    #[test]
    fn system_and_result_map_to_their_tags() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[
                r#"{"type":"system","message":{"content":[{"type":"text","text":"s"}]}}"#,
                r#"{"type":"result","message":{"content":[{"type":"text","text":"r"}]}}"#,
            ],
        );
        assert_eq!(filter_tag(&conv, 0, None), FilterTag::System);
        assert_eq!(filter_tag(&conv, 1, None), FilterTag::Result);
    }

    #[test]
    fn counts_cover_every_message() {
        let mut conv = Conversation::new();
        feed(
            &mut conv,
            &[
                &user("go"),
                r#"{"type":"assistant","message":{"content":[{"type":"text","text":"ok"}]}}"#,
                r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{}}]}}"#,
            ],
        );
        let counts = filter_counts(&conv, None);
        assert_eq!(counts[&FilterTag::InitialPrompt], 1);
        assert_eq!(counts[&FilterTag::Thinking], 1);
        assert_eq!(counts[&FilterTag::Tool], 1);
        assert_eq!(counts.values().sum::<usize>(), conv.messages().len());
    }
}
