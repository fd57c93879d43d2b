// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use ralph_session::{ArchiveEntry, Assignment, ControllerState};
use ralph_stream::{
    Conversation, FilterTag, ProcessedMessage, SessionStats, ToolCall, ToolStatus,
};
use ralph_tracker::TaskInfo;

use crate::layout::centered_rect;
use crate::state::Tab;

fn tag_style(tag: FilterTag) -> Style {
    let color = match tag {
        FilterTag::InitialPrompt => Color::Magenta,
        FilterTag::User => Color::Cyan,
        FilterTag::Thinking => Color::DarkGray,
        FilterTag::Tool => Color::Yellow,
        FilterTag::Assistant => Color::Green,
        FilterTag::Subagent => Color::Blue,
        FilterTag::System => Color::Gray,
        FilterTag::Result => Color::LightGreen,
    };
    Style::default().fg(color)
}

fn status_span(status: ToolStatus) -> Span<'static> {
    match status {
        ToolStatus::Pending => Span::styled("pending", Style::default().fg(Color::Yellow)),
        ToolStatus::Running => Span::styled("running", Style::default().fg(Color::Yellow)),
        ToolStatus::Completed => Span::styled("completed", Style::default().fg(Color::Green)),
        ToolStatus::Error => Span::styled("error", Style::default().fg(Color::Red)),
    }
}

/// Truncate to a display width, appending an ellipsis when cut.
fn truncate_to(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += w;
        out.push(c);
    }
    out
}

fn first_line(message: &ProcessedMessage) -> &str {
    message.text.lines().next().unwrap_or("")
}

// ── Header / status bar ───────────────────────────────────────────────────────

pub fn draw_header(
    frame: &mut Frame,
    area: Rect,
    tab: Tab,
    state: ControllerState,
    viewing_archive: Option<&str>,
) {
    let mut spans = vec![Span::styled(
        " ralph ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for t in [Tab::Conversation, Tab::Stats] {
        let style = if t == tab {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", t.title()), style));
        spans.push(Span::raw(" "));
    }
    match viewing_archive {
        Some(label) => spans.push(Span::styled(
            format!("[archive: {label}]"),
            Style::default().fg(Color::Magenta),
        )),
        None => {
            let (text, color) = match state {
                ControllerState::Running => ("agent running", Color::Green),
                ControllerState::Starting => ("starting…", Color::Yellow),
                ControllerState::Stopping => ("stopping…", Color::Yellow),
                ControllerState::Resuming => ("resuming…", Color::Yellow),
                ControllerState::Idle => ("idle", Color::DarkGray),
            };
            spans.push(Span::styled(text, Style::default().fg(color)));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn draw_status_bar(
    frame: &mut Frame,
    area: Rect,
    error: Option<&str>,
    stream_error: Option<&str>,
    filters_reduced: bool,
) {
    let line = if let Some(err) = error {
        Line::from(Span::styled(
            format!(" {err}"),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(err) = stream_error {
        Line::from(Span::styled(
            format!(" stream: {err}"),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        let mut hint =
            String::from(" q quit  ? shortcuts  p sessions  f filter  n start  x stop  i interrupt");
        if filters_reduced {
            hint.push_str("  [filtered]");
        }
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    };
    frame.render_widget(Paragraph::new(line), area);
}

// ── Conversation list ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn draw_messages(
    frame: &mut Frame,
    area: Rect,
    conversation: &Conversation,
    visible: &[usize],
    selected: usize,
    initial_prompt: Option<usize>,
    session_start: Option<usize>,
    show_timestamps: bool,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" messages ({}) ", visible.len()));
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    // Window the list around the selection.
    let top = selected.saturating_sub(inner_height.saturating_sub(1));
    let mut lines = Vec::new();
    for (pos, &index) in visible.iter().enumerate().skip(top).take(inner_height) {
        let message = &conversation.messages()[index];
        let tag = ralph_stream::filter_tag(conversation, index, initial_prompt);
        let is_current_session = session_start.map(|s| index >= s).unwrap_or(true);

        let mut spans = Vec::new();
        if pos == selected {
            spans.push(Span::styled("▶ ", Style::default().fg(Color::Cyan)));
        } else {
            spans.push(Span::raw("  "));
        }
        if show_timestamps {
            spans.push(Span::styled(
                message.timestamp.format("%H:%M:%S ").to_string(),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::styled(format!("[{:<14}] ", tag.label()), tag_style(tag)));

        let mut summary = first_line(message).to_string();
        if summary.is_empty() {
            summary = conversation
                .tools_of(message)
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
        }
        let body_style = if is_current_session {
            Style::default()
        } else {
            // previous-session context is dimmed
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(
            truncate_to(&summary, inner_width.saturating_sub(28)),
            body_style,
        ));

        let mut line = Line::from(spans);
        if pos == selected {
            line = line.style(Style::default().add_modifier(Modifier::REVERSED));
        }
        lines.push(line);
    }
    if visible.is_empty() {
        lines.push(Line::from(Span::styled(
            "  waiting for events…",
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ── Detail views ──────────────────────────────────────────────────────────────

pub fn draw_message_detail(
    frame: &mut Frame,
    area: Rect,
    conversation: &Conversation,
    index: usize,
    selected_tool: Option<usize>,
) {
    let message = &conversation.messages()[index];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" message (Esc back, t subagent, e error) ");

    let mut lines = vec![Line::from(vec![
        Span::styled("time: ", Style::default().fg(Color::DarkGray)),
        Span::raw(message.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
    ])];
    if let Some(usage) = &message.usage {
        lines.push(Line::from(vec![
            Span::styled("tokens: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!(
                "in {} / out {} (cache read {}, created {})",
                usage.input_tokens, usage.output_tokens, usage.cache_read, usage.cache_creation
            )),
        ]));
    }
    lines.push(Line::default());
    for text_line in message.text.lines() {
        lines.push(Line::from(Span::raw(text_line.to_string())));
    }
    if !message.tool_calls.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "tool calls:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (pos, call) in conversation.tools_of(message).enumerate() {
            let marker = if selected_tool == Some(pos) { "▶" } else { " " };
            let mut spans = vec![
                Span::raw(format!("{marker} {} ", call.name)),
                status_span(call.status),
            ];
            if let Some(duration) = call.duration {
                spans.push(Span::styled(
                    format!(" {}ms", duration.num_milliseconds()),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            if call.is_subagent {
                let label = call.subagent_description.as_deref().unwrap_or("subagent");
                spans.push(Span::styled(
                    format!("  [{label}]"),
                    Style::default().fg(Color::Blue),
                ));
            }
            lines.push(Line::from(spans));
            if let Some(result) = &call.result {
                let preview = truncate_to(result.lines().next().unwrap_or(""), 100);
                lines.push(Line::from(Span::styled(
                    format!("    → {preview}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

pub fn draw_subagent_detail(
    frame: &mut Frame,
    area: Rect,
    conversation: &Conversation,
    call: &ToolCall,
) {
    let title = format!(
        " subagent: {} (Esc back) ",
        call.subagent_description.as_deref().unwrap_or(&call.id)
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title);

    let mut lines = Vec::new();
    if let Some(kind) = &call.subagent_type {
        lines.push(Line::from(vec![
            Span::styled("type: ", Style::default().fg(Color::DarkGray)),
            Span::raw(kind.clone()),
        ]));
    }
    if let Some(prompt) = &call.subagent_prompt {
        lines.push(Line::from(vec![
            Span::styled("prompt: ", Style::default().fg(Color::DarkGray)),
            Span::raw(truncate_to(prompt, 200)),
        ]));
    }
    lines.push(Line::default());
    for message in conversation.subagent_messages(&call.id) {
        let tools: Vec<&str> = conversation
            .tools_of(message)
            .map(|c| c.name.as_str())
            .collect();
        let mut summary = first_line(message).to_string();
        if summary.is_empty() {
            summary = tools.join(", ");
        }
        lines.push(Line::from(vec![
            Span::styled(
                message.timestamp.format("%H:%M:%S ").to_string(),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(summary),
        ]));
    }
    if let Some(result) = &call.subagent_result {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "result:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in result.lines().take(20) {
            lines.push(Line::from(Span::raw(line.to_string())));
        }
    }
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

pub fn draw_error_detail(frame: &mut Frame, area: Rect, call: &ToolCall) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Red))
        .title(format!(" {} failed (Esc back) ", call.name));
    let mut lines = vec![Line::from(vec![
        Span::styled("input: ", Style::default().fg(Color::DarkGray)),
        Span::raw(call.input.to_string()),
    ])];
    lines.push(Line::default());
    for line in call.result.as_deref().unwrap_or("(no output)").lines() {
        lines.push(Line::from(Span::styled(
            line.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

// ── Stats tab ─────────────────────────────────────────────────────────────────

pub fn draw_stats(frame: &mut Frame, area: Rect, stats: &SessionStats, scope: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" session stats ({scope}) "));
    let t = &stats.total_tokens;
    let mut lines = vec![
        Line::from(format!("messages        {}", stats.message_count)),
        Line::from(format!("tool calls      {}", stats.tool_call_count)),
        Line::from(format!("subagents       {}", stats.subagent_count)),
        Line::from(format!("tool errors     {}", stats.error_count)),
        Line::default(),
        Line::from(format!("input tokens    {}", t.input)),
        Line::from(format!("output tokens   {}", t.output)),
        Line::from(format!("cache read      {}", t.cache_read)),
        Line::from(format!("cache created   {}", t.cache_creation)),
    ];
    if let (Some(start), Some(end)) = (stats.start_time, stats.end_time) {
        lines.push(Line::default());
        lines.push(Line::from(format!(
            "span            {} → {}",
            start.format("%H:%M:%S"),
            end.format("%H:%M:%S")
        )));
    }
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ── Sidebar ───────────────────────────────────────────────────────────────────

pub fn draw_sidebar(
    frame: &mut Frame,
    area: Rect,
    assignment: Option<&Assignment>,
    task: Option<&TaskInfo>,
    stats: &SessionStats,
) {
    if area.width == 0 {
        return;
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" assignment ");
    let mut lines = Vec::new();
    match assignment {
        Some(a) => {
            lines.push(Line::from(vec![
                Span::styled("task: ", Style::default().fg(Color::DarkGray)),
                Span::styled(a.task_id.clone(), Style::default().add_modifier(Modifier::BOLD)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("next: ", Style::default().fg(Color::DarkGray)),
                Span::raw(a.next_step.clone()),
            ]));
            match &a.pull_request_url {
                Some(url) => lines.push(Line::from(vec![
                    Span::styled("pr:   ", Style::default().fg(Color::DarkGray)),
                    Span::raw(url.clone()),
                ])),
                None => lines.push(Line::from(Span::styled(
                    "pr:   (none yet)",
                    Style::default().fg(Color::DarkGray),
                ))),
            }
        }
        None => lines.push(Line::from(Span::styled(
            "no active assignment",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    if let Some(task) = task {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("{} — {}", task.id, truncate_to(&task.title, 40)),
            Style::default(),
        )));
        lines.push(Line::from(Span::styled(
            format!("status: {}", task.status),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format!(
            "tokens {} in / {} out",
            stats.total_tokens.input, stats.total_tokens.output
        ),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        format!("{} tools, {} errors", stats.tool_call_count, stats.error_count),
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

// ── Dialog overlays ───────────────────────────────────────────────────────────

pub fn draw_session_picker(
    frame: &mut Frame,
    area: Rect,
    archives: &[ArchiveEntry],
    selected: usize,
) {
    let height = (archives.len() as u16 + 3).clamp(5, area.height);
    let rect = centered_rect(area, 52, height);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" sessions (Enter pick, Esc close) ");

    let mut lines = Vec::new();
    let row = |pos: usize, label: String| {
        let style = if pos == selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        Line::from(Span::styled(label, style))
    };
    lines.push(row(0, "  + new session".to_string()));
    for (i, entry) in archives.iter().enumerate() {
        lines.push(row(i + 1, format!("  {}", entry.display())));
    }
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

pub fn draw_shortcuts(frame: &mut Frame, area: Rect) {
    let rect = centered_rect(area, 46, 18);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" shortcuts ");
    let rows = [
        ("Tab / h l", "switch tab"),
        ("j / k", "select message"),
        ("g / G", "first / last"),
        ("Enter", "message detail"),
        ("t", "subagent detail"),
        ("e", "error detail"),
        ("Esc", "back / close"),
        ("b", "toggle sidebar"),
        ("p", "session picker"),
        ("f", "filter dialog"),
        ("n", "start new session"),
        ("x", "stop agent"),
        ("i", "interrupt with feedback"),
        ("d", "mark assignment done"),
        ("q", "quit"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!(" {key:<10}"), Style::default().fg(Color::Cyan)),
                Span::raw(*what),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

pub fn draw_filter_dialog(
    frame: &mut Frame,
    area: Rect,
    counts: &std::collections::HashMap<FilterTag, usize>,
    enabled: &std::collections::HashSet<FilterTag>,
) {
    let rect = centered_rect(area, 40, FilterTag::ALL.len() as u16 + 2);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" filters (1-8 toggle, Esc close) ");
    let lines: Vec<Line> = FilterTag::ALL
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            let mark = if enabled.contains(tag) { "x" } else { " " };
            let count = counts.get(tag).copied().unwrap_or(0);
            Line::from(vec![
                Span::styled(format!(" {} [{mark}] ", i + 1), Style::default().fg(Color::Cyan)),
                Span::styled(format!("{:<14}", tag.label()), tag_style(*tag)),
                Span::styled(format!("{count:>5}"), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}

pub fn draw_interrupt_dialog(frame: &mut Frame, area: Rect, input: &str) {
    let rect = centered_rect(area, area.width.saturating_sub(10).min(70), 7);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" interrupt — feedback for the agent (Enter send, Esc cancel) ");
    let lines = vec![
        Line::from(Span::raw(
            "The agent will be stopped and resumed with this feedback:",
        )),
        Line::default(),
        Line::from(vec![
            Span::raw("> "),
            Span::raw(input.to_string()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        rect,
    );
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
