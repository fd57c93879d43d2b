// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// The regions that make up the TUI layout.
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    pub body: Rect,
    /// Zero-width when the sidebar is hidden.
    pub sidebar: Rect,
    pub status_bar: Rect,
}

impl AppLayout {
    /// Calculate layout regions from the terminal area.
    pub fn compute(area: Rect, sidebar_visible: bool) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(area);

        let sidebar_width: u16 = if sidebar_visible {
            // A third of the terminal, within sane bounds.
            (area.width / 3).clamp(24, 48).min(area.width)
        } else {
            0
        };
        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(sidebar_width)])
            .split(vertical[1]);

        AppLayout {
            header: vertical[0],
            body: horizontal[0],
            sidebar: horizontal[1],
            status_bar: vertical[2],
        }
    }

    /// Rows visible inside the body pane's border.
    pub fn body_inner_height(&self) -> u16 {
        self.body.height.saturating_sub(2)
    }
}

/// Centered overlay rect for dialogs, clamped to the containing area.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
