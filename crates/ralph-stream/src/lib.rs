// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Live-log ingestion: JSONL event decoding, conversation assembly, file
//! tailing, and derived statistics / filter tags.

mod conversation;
mod event;
mod filter;
mod stats;
mod tailer;

pub use conversation::{
    Conversation, MessageKind, ProcessedMessage, ToolCall, ToolStatus, SUBAGENT_TOOL,
};
pub use event::{parse_line, ContentBlock, EventKind, RawEvent, Usage};
pub use filter::{filter_counts, filter_tag, initial_prompt_index, FilterTag};
pub use stats::{SessionStats, TokenTotals};
pub use tailer::{spawn as spawn_tailer, TailEvent, Tailer, TailerHandle};
