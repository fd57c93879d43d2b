// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub task_management: TaskManagementConfig,
    /// Template variables substituted as `{{name}}` in prompt files.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

fn default_session_dir() -> String {
    ".ralph".into()
}
fn default_live_log_name() -> String {
    "claude_output.jsonl".into()
}
fn default_archive_dir_name() -> String {
    "archive".into()
}
fn default_lock_name() -> String {
    "claude.lock".into()
}
fn default_active_project() -> String {
    "default".into()
}

/// Filesystem layout of the session state directory.
///
/// Everything lives under `<project_root>/<session_dir>`:
///
/// ```text
/// .ralph/
///   settings.json
///   settings.local.json
///   claude_output.jsonl        (live log)
///   claude.lock                (decimal PID of the running harness)
///   archive/
///   projects/<name>/
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Session state directory, relative to the project root.
    #[serde(default = "default_session_dir")]
    pub session_dir: String,
    /// File name of the live JSONL log inside the session directory.
    #[serde(default = "default_live_log_name")]
    pub live_log_name: String,
    /// Directory (inside the session directory) that holds archived logs.
    #[serde(default = "default_archive_dir_name")]
    pub archive_dir_name: String,
    /// File name of the harness PID lock inside the session directory.
    #[serde(default = "default_lock_name")]
    pub lock_name: String,
    /// Name of the active project under `projects/`.  Selects which
    /// `execute.md`, `assignment.json` and settings layers apply.
    #[serde(default = "default_active_project")]
    pub active_project: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            session_dir: default_session_dir(),
            live_log_name: default_live_log_name(),
            archive_dir_name: default_archive_dir_name(),
            lock_name: default_lock_name(),
            active_project: default_active_project(),
        }
    }
}

fn default_agent_script() -> String {
    ".ralph/ralph.sh".into()
}
fn default_resume_command() -> String {
    "claude".into()
}
fn default_startup_grace_ms() -> u64 {
    2000
}
fn default_liveness_poll_ms() -> u64 {
    5000
}
fn default_tail_poll_ms() -> u64 {
    500
}
fn default_kill_patterns() -> Vec<String> {
    vec!["ralph.sh".into(), "sync.sh".into(), ".ralph/".into()]
}

/// Harness process control: what to spawn and how patiently to watch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// The harness script started by the "start" command, relative to the
    /// project root.  It is expected to write its PID into the lock file and
    /// append JSONL events to the live log.
    #[serde(default = "default_agent_script")]
    pub agent_script: String,
    /// Command used to relaunch the assistant on interrupt + resume.
    /// Invoked as `<resume_command> [resume_args..] --resume <session_id>`
    /// with the combined prompt piped on stdin.
    #[serde(default = "default_resume_command")]
    pub resume_command: String,
    /// Extra arguments inserted before the `--resume` token.
    #[serde(default)]
    pub resume_args: Vec<String>,
    /// Grace period after spawning before the lock liveness check decides
    /// whether the start succeeded.
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: u64,
    /// Interval of the background liveness probe that recovers from the
    /// harness dying out-of-band.
    #[serde(default = "default_liveness_poll_ms")]
    pub liveness_poll_ms: u64,
    /// Poll interval of the live-log tailer.  Polling is used instead of an
    /// inotify-style watcher; those are unreliable for files appended by
    /// external processes or living on network filesystems.
    #[serde(default = "default_tail_poll_ms")]
    pub tail_poll_ms: u64,
    /// Command-line patterns swept with `pkill -f` during stop, so children
    /// of the harness do not outlive it.
    #[serde(default = "default_kill_patterns")]
    pub kill_patterns: Vec<String>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            agent_script: default_agent_script(),
            resume_command: default_resume_command(),
            resume_args: Vec::new(),
            startup_grace_ms: default_startup_grace_ms(),
            liveness_poll_ms: default_liveness_poll_ms(),
            tail_poll_ms: default_tail_poll_ms(),
            kill_patterns: default_kill_patterns(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show the sidebar (assignment, task info, session stats) on startup.
    #[serde(default = "default_true")]
    pub sidebar: bool,
    /// Show per-message timestamps in the conversation list.
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sidebar: true,
            timestamps: true,
        }
    }
}

fn default_resume_prompt() -> String {
    ".ralph/prompts/resume.md".into()
}
fn default_orchestration_prompt() -> String {
    ".ralph/prompts/orchestration.md".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Which assistant CLI the harness drives.
    #[serde(rename = "type", default)]
    pub agent_type: AgentKind,
    /// Template file whose expansion is piped to the assistant on resume.
    /// Supports `@file` includes and `{{variable}}` substitution.
    #[serde(default = "default_resume_prompt")]
    pub resume_prompt: String,
    /// Template file the harness feeds the assistant on a fresh start.
    /// Its presence is verified before the harness is spawned.
    #[serde(default = "default_orchestration_prompt")]
    pub orchestration_prompt: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            agent_type: AgentKind::default(),
            resume_prompt: default_resume_prompt(),
            orchestration_prompt: default_orchestration_prompt(),
        }
    }
}

/// Supported assistant CLIs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    #[default]
    ClaudeCode,
    Codex,
    Opencode,
    Kiro,
    Custom,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentKind::ClaudeCode => "claude-code",
            AgentKind::Codex => "codex",
            AgentKind::Opencode => "opencode",
            AgentKind::Kiro => "kiro",
            AgentKind::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude-code" => Ok(AgentKind::ClaudeCode),
            "codex" => Ok(AgentKind::Codex),
            "opencode" => Ok(AgentKind::Opencode),
            "kiro" => Ok(AgentKind::Kiro),
            "custom" => Ok(AgentKind::Custom),
            other => Err(format!(
                "unknown agent type '{other}' (valid: claude-code, codex, opencode, kiro, custom)"
            )),
        }
    }
}

/// Supported task-tracker providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerProvider {
    VibeKanban,
    GithubIssues,
    Jira,
    Linear,
    Beads,
}

impl std::fmt::Display for TrackerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrackerProvider::VibeKanban => "vibe-kanban",
            TrackerProvider::GithubIssues => "github-issues",
            TrackerProvider::Jira => "jira",
            TrackerProvider::Linear => "linear",
            TrackerProvider::Beads => "beads",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TrackerProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vibe-kanban" => Ok(TrackerProvider::VibeKanban),
            "github-issues" => Ok(TrackerProvider::GithubIssues),
            "jira" => Ok(TrackerProvider::Jira),
            "linear" => Ok(TrackerProvider::Linear),
            "beads" => Ok(TrackerProvider::Beads),
            other => Err(format!(
                "unknown provider '{other}' (valid: vibe-kanban, github-issues, jira, linear, beads)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskManagementConfig {
    /// Selected tracker adapter; `None` disables task lookups entirely.
    #[serde(default)]
    pub provider: Option<TrackerProvider>,
    /// Free-form adapter configuration forwarded as-is to the provider.
    #[serde(default)]
    pub provider_config: serde_json::Value,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
