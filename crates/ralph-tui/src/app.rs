// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Top-level TUI application state and event loop.
//!
//! All mutable state is owned here and mutated only on this task; the tailer
//! and the liveness timer communicate through channels, so nothing needs a
//! lock.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::{DefaultTerminal, Frame};
use tracing::debug;

use ralph_config::Config;
use ralph_session::{archive, assignment, ArchiveEntry, ControllerState, ProcessController};
use ralph_stream::{
    filter_counts, filter_tag, initial_prompt_index, Conversation, SessionStats, TailEvent,
    TailerHandle,
};
use ralph_tracker::{TaskInfo, TaskTracker};

use crate::keys::{map_key, Action};
use crate::layout::AppLayout;
use crate::state::{Dialog, Tab, View, ViewState};
use crate::widgets;

/// Options passed when constructing the TUI app.
pub struct AppOptions {
    /// Follow the log without offering process control (`--watch`).
    pub watch_only: bool,
}

/// The top-level TUI application state.
pub struct App {
    config: Arc<Config>,
    view: ViewState,
    conversation: Conversation,
    controller: ProcessController,
    tail: TailerHandle,
    archives: Vec<ArchiveEntry>,
    /// Label of the archived session currently displayed, if any.
    viewing_archive: Option<String>,
    assignment: Option<ralph_session::Assignment>,
    task: Option<TaskInfo>,
    tracker: Option<Box<dyn TaskTracker>>,
    watch_only: bool,
}

impl App {
    pub fn new(
        config: Arc<Config>,
        controller: ProcessController,
        tail: TailerHandle,
        options: AppOptions,
    ) -> Self {
        let tracker = ralph_tracker::from_config(
            config.task_management.provider,
            &config.task_management.provider_config,
        );
        let view = ViewState::new(config.display.sidebar);
        Self {
            config,
            view,
            conversation: Conversation::new(),
            controller,
            tail,
            archives: Vec::new(),
            viewing_archive: None,
            assignment: None,
            task: None,
            tracker,
            watch_only: options.watch_only,
        }
    }

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> anyhow::Result<()> {
        let mut term_events = EventStream::new();
        let mut liveness = tokio::time::interval(Duration::from_millis(
            self.config.process.liveness_poll_ms,
        ));
        liveness.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.assignment = assignment::load(&self.controller.paths().assignment_path());

        loop {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                Some(event) = self.tail.events.recv() => {
                    self.handle_tail_event(event);
                    // Drain whatever else is queued before redrawing.
                    while let Ok(event) = self.tail.events.try_recv() {
                        self.handle_tail_event(event);
                    }
                }
                maybe_event = term_events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            if self.handle_key(key).await {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                _ = liveness.tick() => self.on_liveness_tick().await,
            }
        }
        Ok(())
    }

    // ── Stream events ─────────────────────────────────────────────────────────

    fn handle_tail_event(&mut self, event: TailEvent) {
        match event {
            TailEvent::Lines(lines) => {
                let was_at_tail = self.view.at_tail(self.visible_indices().len());
                self.conversation.apply_chunk(&lines);
                let visible = self.visible_indices().len();
                if was_at_tail {
                    self.view.select_last(visible);
                } else {
                    self.view.clamp_selection(visible);
                }
                self.view.stream_error = None;
            }
            TailEvent::Reset => {
                debug!("stream reset");
                self.conversation.reset();
                self.view.session_start_index = None;
                self.view.reset_detail_state();
            }
            TailEvent::NotFound => {
                self.view.stream_error =
                    Some("live log not found (waiting for it to appear)".into());
            }
            TailEvent::StreamError(err) => {
                self.view.stream_error = Some(err);
            }
        }
    }

    async fn on_liveness_tick(&mut self) {
        self.controller.refresh();
        let assignment_path = self.controller.paths().assignment_path();
        let assignment = assignment::load(&assignment_path);
        if assignment != self.assignment {
            self.task = None;
            self.assignment = assignment;
        }
        if self.task.is_none() {
            if let (Some(a), Some(tracker)) = (&self.assignment, &self.tracker) {
                if tracker.is_present() {
                    self.task = tracker.fetch_task(&a.task_id).await.ok();
                }
            }
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    async fn handle_key(&mut self, key: KeyEvent) -> bool {
        match map_key(key, self.view.dialog) {
            Some(action) => self.dispatch(action).await,
            None => false,
        }
    }

    async fn dispatch(&mut self, action: Action) -> bool {
        let visible = self.visible_indices();
        match action {
            Action::Quit => return true,

            Action::NextTab => self.view.tab = self.view.tab.next(),
            Action::PrevTab => self.view.tab = self.view.tab.prev(),
            Action::SelectNext => self.view.select_next(visible.len()),
            Action::SelectPrev => self.view.select_prev(),
            Action::SelectFirst => self.view.selected = 0,
            Action::SelectLast => self.view.select_last(visible.len()),

            Action::OpenDetail => {
                if !visible.is_empty() {
                    self.view.open_message_detail();
                }
            }
            Action::OpenSubagentDetail => {
                if let Some(pos) = self.find_tool(&visible, |c| c.is_subagent) {
                    self.view.open_subagent_detail(pos);
                }
            }
            Action::OpenErrorDetail => {
                if let Some(pos) = self.find_tool(&visible, |c| c.is_error == Some(true)) {
                    self.view.open_error_detail(pos);
                }
            }
            Action::Back => self.view.back(),
            Action::ToggleSidebar => self.view.sidebar = !self.view.sidebar,

            Action::OpenSessionPicker => {
                match ralph_session::list_archives(self.controller.paths()) {
                    Ok(archives) => {
                        self.archives = archives;
                        self.view.open_dialog(Dialog::SessionPicker);
                    }
                    Err(err) => self.view.set_error(err.to_string()),
                }
            }
            Action::OpenShortcuts => self.view.open_dialog(Dialog::Shortcuts),
            Action::OpenFilter => self.view.open_dialog(Dialog::Filter),
            Action::OpenInterrupt => {
                if self.watch_only {
                    self.view.set_error("process control is disabled in watch mode");
                } else if self.controller.state() == ControllerState::Running {
                    self.view.open_dialog(Dialog::Interrupt);
                } else {
                    self.view.set_error("agent is not running; nothing to interrupt");
                }
            }
            Action::DialogClose => self.view.close_dialog(),

            Action::PickerNext => {
                if self.view.picker_index < self.archives.len() {
                    self.view.picker_index += 1;
                }
            }
            Action::PickerPrev => {
                self.view.picker_index = self.view.picker_index.saturating_sub(1);
            }
            Action::PickerSelect => {
                let pick = self.view.picker_index;
                self.view.close_dialog();
                self.switch_session(pick).await;
            }
            Action::FilterToggle(position) => {
                if let Some(tag) = ralph_stream::FilterTag::ALL.get(position as usize - 1) {
                    self.view.toggle_filter(*tag);
                    let len = self.visible_indices().len();
                    self.view.clamp_selection(len);
                }
            }

            Action::InterruptChar(c) => self.view.interrupt_input.push(c),
            Action::InterruptBackspace => {
                self.view.interrupt_input.pop();
            }
            Action::InterruptSubmit => {
                let feedback = std::mem::take(&mut self.view.interrupt_input);
                self.view.close_dialog();
                self.interrupt(&feedback).await;
            }

            Action::StartSession => self.start_new_session().await,
            Action::StopSession => {
                if self.watch_only {
                    self.view.set_error("process control is disabled in watch mode");
                } else {
                    match self.controller.stop().await {
                        Ok(()) => self.view.clear_error(),
                        Err(err) => self.view.set_error(err.to_string()),
                    }
                }
            }
            Action::CompleteAssignment => {
                let path = self.controller.paths().assignment_path();
                match assignment::remove(&path) {
                    Ok(()) => {
                        self.assignment = None;
                        self.task = None;
                        self.view.clear_error();
                    }
                    Err(err) => self.view.set_error(err.to_string()),
                }
            }
        }
        false
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Archive the live log, create a fresh one, clear the session boundary,
    /// start the harness.
    async fn start_new_session(&mut self) {
        if self.watch_only {
            self.view.set_error("process control is disabled in watch mode");
            return;
        }
        if let Err(err) = self.fresh_live_log().await {
            self.view.set_error(err.to_string());
            return;
        }
        match self.controller.start().await {
            Ok(()) => self.view.clear_error(),
            Err(err) => self.view.set_error(err.to_string()),
        }
    }

    /// Session-picker choice: 0 is "new session", everything else an archive.
    async fn switch_session(&mut self, pick: usize) {
        if pick == 0 {
            if let Err(err) = self.fresh_live_log().await {
                self.view.set_error(err.to_string());
            }
        } else if let Some(entry) = self.archives.get(pick - 1) {
            self.viewing_archive = Some(entry.display());
            let _ = self.tail.retarget.send(entry.path.clone()).await;
        }
        self.view.reset_detail_state();
    }

    /// Archive (when non-empty) and point the tailer back at the live log.
    async fn fresh_live_log(&mut self) -> anyhow::Result<()> {
        let paths = self.controller.paths().clone();
        archive::archive_live_log(&paths)?;
        archive::ensure_live_log(&paths)?;
        self.viewing_archive = None;
        self.view.session_start_index = None;
        let _ = self.tail.retarget.send(paths.live_log().to_path_buf()).await;
        Ok(())
    }

    /// Record the session boundary, then stop + resume with feedback.
    async fn interrupt(&mut self, feedback: &str) {
        self.view.session_start_index = Some(self.conversation.messages().len());
        let session_id = self.conversation.session_id().map(str::to_string);
        match self
            .controller
            .resume(session_id.as_deref(), feedback)
            .await
        {
            Ok(()) => self.view.clear_error(),
            Err(err) => self.view.set_error(err.to_string()),
        }
    }

    // ── Derived state ─────────────────────────────────────────────────────────

    fn visible_indices(&self) -> Vec<usize> {
        let initial = initial_prompt_index(&self.conversation, self.view.session_start_index);
        (0..self.conversation.messages().len())
            .filter(|&ix| {
                let tag = filter_tag(&self.conversation, ix, initial);
                self.view.enabled_filters.contains(&tag)
            })
            .collect()
    }

    fn selected_message(&self, visible: &[usize]) -> Option<usize> {
        visible.get(self.view.selected).copied()
    }

    /// Position of the first tool call of the selected message matching the
    /// predicate.
    fn find_tool(
        &self,
        visible: &[usize],
        predicate: impl Fn(&ralph_stream::ToolCall) -> bool,
    ) -> Option<usize> {
        let index = self.selected_message(visible)?;
        let message = &self.conversation.messages()[index];
        self.conversation
            .tools_of(message)
            .enumerate()
            .find(|(_, call)| predicate(call))
            .map(|(pos, _)| pos)
    }

    /// Stats scope: the current-session slice only while the agent is
    /// running and a boundary is set, otherwise the whole list.
    fn current_stats(&self) -> (SessionStats, &'static str) {
        let running = self.controller.state() == ControllerState::Running;
        match self.view.session_start_index {
            Some(boundary) if running => (
                SessionStats::compute(&self.conversation, Some(boundary)),
                "current session",
            ),
            _ => (SessionStats::compute(&self.conversation, None), "all"),
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let layout = AppLayout::compute(frame.area(), self.view.sidebar);
        let visible = self.visible_indices();
        let initial = initial_prompt_index(&self.conversation, self.view.session_start_index);
        let (stats, scope) = self.current_stats();

        widgets::draw_header(
            frame,
            layout.header,
            self.view.tab,
            self.controller.state(),
            self.viewing_archive.as_deref(),
        );

        match (self.view.view, self.view.tab) {
            (View::SubagentDetail, _) | (View::ErrorDetail, _) | (View::MessageDetail, _) => {
                self.render_detail(frame, layout.body, &visible)
            }
            (View::Main, Tab::Conversation) => widgets::draw_messages(
                frame,
                layout.body,
                &self.conversation,
                &visible,
                self.view.selected,
                initial,
                self.view.session_start_index,
                self.config.display.timestamps,
            ),
            (View::Main, Tab::Stats) => {
                widgets::draw_stats(frame, layout.body, &stats, scope)
            }
        }

        if self.view.sidebar {
            widgets::draw_sidebar(
                frame,
                layout.sidebar,
                self.assignment.as_ref(),
                self.task.as_ref(),
                &stats,
            );
        }

        widgets::draw_status_bar(
            frame,
            layout.status_bar,
            self.view.error.as_deref(),
            self.view.stream_error.as_deref(),
            self.view.enabled_filters.len() < ralph_stream::FilterTag::ALL.len(),
        );

        match self.view.dialog {
            Dialog::SessionPicker => widgets::draw_session_picker(
                frame,
                frame.area(),
                &self.archives,
                self.view.picker_index,
            ),
            Dialog::Shortcuts => widgets::draw_shortcuts(frame, frame.area()),
            Dialog::Filter => {
                let counts = filter_counts(&self.conversation, self.view.session_start_index);
                widgets::draw_filter_dialog(
                    frame,
                    frame.area(),
                    &counts,
                    &self.view.enabled_filters,
                );
            }
            Dialog::Interrupt => widgets::draw_interrupt_dialog(
                frame,
                frame.area(),
                &self.view.interrupt_input,
            ),
            Dialog::None => {}
        }
    }

    fn render_detail(&self, frame: &mut Frame, area: ratatui::layout::Rect, visible: &[usize]) {
        let Some(index) = self.selected_message(visible) else {
            widgets::draw_messages(
                frame,
                area,
                &self.conversation,
                visible,
                self.view.selected,
                None,
                self.view.session_start_index,
                self.config.display.timestamps,
            );
            return;
        };
        let message = &self.conversation.messages()[index];
        match self.view.view {
            View::MessageDetail => widgets::draw_message_detail(
                frame,
                area,
                &self.conversation,
                index,
                self.view.selected_tool,
            ),
            View::SubagentDetail | View::ErrorDetail => {
                let call = self
                    .view
                    .selected_tool
                    .and_then(|pos| self.conversation.tools_of(message).nth(pos));
                match (self.view.view, call) {
                    (View::SubagentDetail, Some(call)) => {
                        widgets::draw_subagent_detail(frame, area, &self.conversation, call)
                    }
                    (View::ErrorDetail, Some(call)) => {
                        widgets::draw_error_detail(frame, area, call)
                    }
                    _ => widgets::draw_message_detail(
                        frame,
                        area,
                        &self.conversation,
                        index,
                        None,
                    ),
                }
            }
            View::Main => unreachable!("render_detail is only called for detail views"),
        }
    }
}
