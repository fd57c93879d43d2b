// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Multi-tab terminal UI over the assembled conversation, with process
//! control commands wired to the session controller.

mod app;
mod keys;
mod layout;
mod state;
mod widgets;

pub use app::{App, AppOptions};
pub use keys::{map_key, Action};
pub use state::{Dialog, Tab, View, ViewState};
