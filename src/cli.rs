// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ralph",
    about = "Terminal monitor and control surface for an autonomous coding-agent loop",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the live JSONL log (overrides the configured location)
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Tracker issue to pre-select; exposed to templates as {{issue}}
    #[arg(long, short = 'i', value_name = "ID")]
    pub issue: Option<String>,

    /// Show the sidebar
    #[arg(long, short = 's', overrides_with = "no_sidebar")]
    pub sidebar: bool,

    /// Hide the sidebar
    #[arg(long = "no-sidebar", short = 'S')]
    pub no_sidebar: bool,

    /// Agent type (claude-code | codex | opencode | kiro | custom)
    #[arg(long, short = 'a', value_name = "TYPE")]
    pub agent: Option<String>,

    /// Watch only: follow the log without offering process control
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Increase verbosity (-v = debug, -vv = trace).  Logs go to stderr for
    /// subcommands and to $RALPH_LOG_FILE in TUI mode.
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Combined `-s` / `-S` into a tri-state override.
    pub fn sidebar_override(&self) -> Option<bool> {
        if self.sidebar {
            Some(true)
        } else if self.no_sidebar {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold the `.ralph/` state directory (settings, harness script,
    /// prompt templates, default project).  Idempotent: existing files are
    /// left alone unless --force is given.
    Init {
        /// Agent type to write into settings
        /// (claude-code | codex | opencode | kiro | custom)
        #[arg(long, value_name = "TYPE")]
        agent: Option<String>,

        /// Task tracker provider to write into settings
        /// (vibe-kanban | github-issues | jira | linear | beads)
        #[arg(long, value_name = "TYPE")]
        provider: Option<String>,

        /// Print what would be written without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Overwrite files that already exist
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ralph", &mut std::io::stdout());
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
