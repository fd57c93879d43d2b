// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Incremental conversation assembly from the decoded event stream.
//!
//! Tool calls live in a single arena owned by [`Conversation`]; messages
//! reference them by stable index.  Both the per-message tool list and the
//! id map point at the same arena cell, so a tool result updates the call
//! everywhere it is visible.  Subagent message lists are owned by the
//! `subagents` map keyed on the parent tool id; the parent `ToolCall` holds
//! no list of its own, which keeps the ownership graph acyclic.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::event::{parse_line, ContentBlock, EventKind, RawEvent, Usage};

/// Name of the tool that spawns a nested subagent conversation.
pub const SUBAGENT_TOOL: &str = "Task";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl ToolStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolStatus::Completed | ToolStatus::Error)
    }
}

#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
    pub status: ToolStatus,
    pub is_error: Option<bool>,
    pub result: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock from tool use to its result, when both were seen.
    pub duration: Option<Duration>,
    pub is_subagent: bool,
    pub subagent_type: Option<String>,
    pub subagent_description: Option<String>,
    pub subagent_prompt: Option<String>,
    pub subagent_result: Option<String>,
}

impl ToolCall {
    fn new(id: String, name: String, input: Value, timestamp: DateTime<Utc>) -> Self {
        let is_subagent = name == SUBAGENT_TOOL;
        let str_field = |key: &str| {
            input
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let (subagent_type, subagent_description, subagent_prompt) = if is_subagent {
            (
                str_field("subagent_type"),
                str_field("description"),
                str_field("prompt"),
            )
        } else {
            (None, None, None)
        };
        Self {
            id,
            name,
            input,
            status: ToolStatus::Pending,
            is_error: None,
            result: None,
            timestamp,
            duration: None,
            is_subagent,
            subagent_type,
            subagent_description,
            subagent_prompt,
            subagent_result: None,
        }
    }

    /// Apply a matched tool result.  Terminal states never change again, so
    /// a duplicate result line is a no-op.
    fn finish(&mut self, content: Option<&str>, is_error: bool, at: DateTime<Utc>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = if is_error {
            ToolStatus::Error
        } else {
            ToolStatus::Completed
        };
        let text = content.unwrap_or("").to_string();
        self.is_error = Some(is_error);
        self.duration = Some(at - self.timestamp);
        if self.is_subagent {
            self.subagent_result = Some(text.clone());
        }
        self.result = Some(text);
    }
}

/// Message roles that survive assembly (tool_use / tool_result events never
/// become messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
    System,
    Result,
}

#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    /// Unique per event.
    pub id: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    /// Text blocks joined by newline.
    pub text: String,
    /// Arena indices of the tool calls this message introduced.
    pub tool_calls: Vec<usize>,
    pub usage: Option<Usage>,
}

/// The assembled conversation state.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ProcessedMessage>,
    tools: Vec<ToolCall>,
    /// Main-conversation tool-use id → arena index.
    tool_index: HashMap<String, usize>,
    /// Parent tool-use id → ordered subagent messages.
    subagents: HashMap<String, Vec<ProcessedMessage>>,
    /// Most recent session id seen on any event.
    session_id: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all assembled state (log rotation, session switch).
    pub fn reset(&mut self) {
        self.messages.clear();
        self.tools.clear();
        self.tool_index.clear();
        self.subagents.clear();
        self.session_id = None;
    }

    pub fn messages(&self) -> &[ProcessedMessage] {
        &self.messages
    }

    pub fn tool(&self, index: usize) -> &ToolCall {
        &self.tools[index]
    }

    /// Tool calls of one message, in emission order.
    pub fn tools_of<'a>(
        &'a self,
        message: &'a ProcessedMessage,
    ) -> impl Iterator<Item = &'a ToolCall> {
        message.tool_calls.iter().map(|&ix| &self.tools[ix])
    }

    /// Look up a main-conversation tool call by its wire id.
    pub fn tool_by_id(&self, id: &str) -> Option<&ToolCall> {
        self.tool_index.get(id).map(|&ix| &self.tools[ix])
    }

    /// Messages of the subagent nested under the given tool call.
    pub fn subagent_messages(&self, parent_tool_id: &str) -> &[ProcessedMessage] {
        self.subagents
            .get(parent_tool_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Parse and apply one log line.  Returns true if the line decoded into
    /// an event (whether or not it produced a visible message).
    pub fn apply_line(&mut self, line: &str) -> bool {
        match parse_line(line) {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply a batch of lines.  Equivalent to applying them one at a time;
    /// chunk boundaries carry no meaning.
    pub fn apply_chunk(&mut self, lines: &[String]) {
        for line in lines {
            self.apply_line(line);
        }
    }

    /// Feed one decoded event through the assembly steps: route, match tool
    /// results, emit, register, collapse.
    pub fn apply(&mut self, event: RawEvent) {
        if let Some(sid) = &event.session_id {
            self.session_id = Some(sid.clone());
        }
        let timestamp = event.timestamp.unwrap_or_else(Utc::now);
        let parent = event.parent_tool_use_id.clone();

        self.match_tool_results(&event, parent.as_deref(), timestamp);

        if matches!(event.kind, EventKind::ToolUse | EventKind::ToolResult) {
            return;
        }
        let all_results = !event.content.is_empty()
            && event.content.iter().all(ContentBlock::is_tool_result);
        if event.kind == EventKind::User && all_results {
            // Pure tool-result carrier; it already updated the calls above.
            return;
        }

        let kind = match event.kind {
            EventKind::User => MessageKind::User,
            EventKind::Assistant => MessageKind::Assistant,
            EventKind::System => MessageKind::System,
            EventKind::Result => MessageKind::Result,
            EventKind::ToolUse | EventKind::ToolResult => unreachable!(),
        };

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();
        for block in &event.content {
            match block {
                ContentBlock::Text { text } => text_parts.push(text.as_str()),
                ContentBlock::ToolUse { id, name, input } => {
                    let call =
                        ToolCall::new(id.clone(), name.clone(), input.clone(), timestamp);
                    let is_subagent = call.is_subagent;
                    let ix = self.tools.len();
                    self.tools.push(call);
                    tool_calls.push(ix);
                    if parent.is_none() {
                        self.tool_index.insert(id.clone(), ix);
                        if is_subagent {
                            self.subagents.entry(id.clone()).or_default();
                        }
                    }
                }
                ContentBlock::ToolResult { .. } => {}
            }
        }

        let message = ProcessedMessage {
            id: Uuid::new_v4().to_string(),
            kind,
            timestamp,
            text: text_parts.join("\n"),
            tool_calls,
            usage: event.usage,
        };

        match parent {
            Some(parent_id) => {
                self.subagents.entry(parent_id).or_default().push(message);
            }
            None => self.push_main(message),
        }
    }

    /// Insert into the main list, collapsing a `result` echo of the previous
    /// assistant message (identical trimmed text) into that message.
    fn push_main(&mut self, message: ProcessedMessage) {
        if message.kind == MessageKind::Result {
            if let Some(last) = self.messages.last() {
                if last.kind == MessageKind::Assistant
                    && last.text.trim() == message.text.trim()
                {
                    return;
                }
            }
        }
        self.messages.push(message);
    }

    fn match_tool_results(
        &mut self,
        event: &RawEvent,
        parent: Option<&str>,
        timestamp: DateTime<Utc>,
    ) {
        let results: Vec<(&str, Option<&str>, bool)> = event
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => Some((tool_use_id.as_str(), content.as_deref(), *is_error)),
                _ => None,
            })
            .collect();
        if results.is_empty() {
            return;
        }

        let matched: Vec<(usize, Option<String>, bool)> = {
            // The match scope depends on routing: main events match the main
            // id map, subagent events match only the tool calls of that
            // subagent's own messages.
            let scope: HashMap<&str, usize> = match parent {
                None => self
                    .tool_index
                    .iter()
                    .map(|(id, &ix)| (id.as_str(), ix))
                    .collect(),
                Some(parent_id) => self
                    .subagents
                    .get(parent_id)
                    .map(|messages| {
                        messages
                            .iter()
                            .flat_map(|m| m.tool_calls.iter())
                            .map(|&ix| (self.tools[ix].id.as_str(), ix))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
                    .into_iter()
                    .collect(),
            };
            results
                .into_iter()
                .filter_map(|(id, content, is_error)| {
                    // Results with no known tool call are dropped.
                    scope
                        .get(id)
                        .map(|&ix| (ix, content.map(str::to_string), is_error))
                })
                .collect()
        };
        for (ix, content, is_error) in matched {
            self.tools[ix].finish(content.as_deref(), is_error, timestamp);
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
