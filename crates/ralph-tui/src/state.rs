// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! View-model state.
//!
//! Everything the key handler and the draw pass share lives here, behind
//! transition methods, so a navigation change cannot leave half the fields
//! pointing at the previous view.

use std::collections::HashSet;

use ralph_stream::FilterTag;

/// Top-level tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Conversation,
    Stats,
}

impl Tab {
    pub fn next(self) -> Self {
        match self {
            Tab::Conversation => Tab::Stats,
            Tab::Stats => Tab::Conversation,
        }
    }

    pub fn prev(self) -> Self {
        // Two tabs: previous and next coincide.
        self.next()
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::Conversation => "Conversation",
            Tab::Stats => "Stats",
        }
    }
}

/// What the body of the active tab shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Main,
    MessageDetail,
    SubagentDetail,
    ErrorDetail,
}

/// Modal overlay, at most one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    None,
    SessionPicker,
    Shortcuts,
    Filter,
    Interrupt,
}

#[derive(Debug)]
pub struct ViewState {
    pub tab: Tab,
    pub view: View,
    pub dialog: Dialog,
    /// Position within the *visible* (filtered) message list.
    pub selected: usize,
    /// Position within the selected message's tool calls, for the
    /// subagent / error detail views.
    pub selected_tool: Option<usize>,
    pub sidebar: bool,
    /// Boundary of the current session inside the assembled message list.
    /// Messages at this index or later belong to the running session.
    pub session_start_index: Option<usize>,
    pub enabled_filters: HashSet<FilterTag>,
    /// Tab to return to when leaving the subagent detail view.
    pub source_tab: Tab,
    /// Cursor within the session-picker list (0 = "new session").
    pub picker_index: usize,
    /// Feedback text being typed into the interrupt dialog.
    pub interrupt_input: String,
    /// One-shot error cell; displayed until the next successful transition.
    pub error: Option<String>,
    /// Reactive stream-error value; cleared when lines flow again.
    pub stream_error: Option<String>,
}

impl ViewState {
    pub fn new(sidebar: bool) -> Self {
        Self {
            tab: Tab::Conversation,
            view: View::Main,
            dialog: Dialog::None,
            selected: 0,
            selected_tool: None,
            sidebar,
            session_start_index: None,
            enabled_filters: FilterTag::ALL.into_iter().collect(),
            source_tab: Tab::Conversation,
            picker_index: 0,
            interrupt_input: String::new(),
            error: None,
            stream_error: None,
        }
    }

    // ── Navigation ────────────────────────────────────────────────────────────

    pub fn select_next(&mut self, visible_len: usize) {
        if visible_len > 0 && self.selected + 1 < visible_len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_last(&mut self, visible_len: usize) {
        self.selected = visible_len.saturating_sub(1);
    }

    pub fn clamp_selection(&mut self, visible_len: usize) {
        if visible_len == 0 {
            self.selected = 0;
        } else if self.selected >= visible_len {
            self.selected = visible_len - 1;
        }
    }

    /// True when the cursor sits on the last visible message (follow mode).
    pub fn at_tail(&self, visible_len: usize) -> bool {
        visible_len == 0 || self.selected + 1 >= visible_len
    }

    // ── View transitions ──────────────────────────────────────────────────────

    pub fn open_message_detail(&mut self) {
        self.view = View::MessageDetail;
    }

    pub fn open_subagent_detail(&mut self, tool_position: usize) {
        self.source_tab = self.tab;
        self.selected_tool = Some(tool_position);
        self.view = View::SubagentDetail;
    }

    pub fn open_error_detail(&mut self, tool_position: usize) {
        self.selected_tool = Some(tool_position);
        self.view = View::ErrorDetail;
    }

    pub fn back(&mut self) {
        match self.view {
            View::SubagentDetail => {
                self.tab = self.source_tab;
                self.selected_tool = None;
                self.view = View::Main;
            }
            View::ErrorDetail => {
                self.selected_tool = None;
                self.view = View::MessageDetail;
            }
            View::MessageDetail => self.view = View::Main,
            View::Main => {}
        }
    }

    /// Forget everything tied to the current conversation (session switch).
    pub fn reset_detail_state(&mut self) {
        self.view = View::Main;
        self.dialog = Dialog::None;
        self.selected = 0;
        self.selected_tool = None;
        self.picker_index = 0;
        self.interrupt_input.clear();
    }

    // ── Dialogs ───────────────────────────────────────────────────────────────

    pub fn open_dialog(&mut self, dialog: Dialog) {
        self.dialog = dialog;
        if dialog == Dialog::SessionPicker {
            self.picker_index = 0;
        }
        if dialog == Dialog::Interrupt {
            self.interrupt_input.clear();
        }
    }

    pub fn close_dialog(&mut self) {
        self.dialog = Dialog::None;
    }

    pub fn toggle_filter(&mut self, tag: FilterTag) {
        if !self.enabled_filters.remove(&tag) {
            self.enabled_filters.insert(tag);
        }
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Clear the one-shot error on a successful transition.
    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
