// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `ralph init`: scaffold the `.ralph/` state directory.

use std::path::Path;

use anyhow::Context;
use ralph_config::{AgentKind, TrackerProvider};

const HARNESS_SCRIPT: &str = r#"#!/bin/sh
# Agent harness loop.  Writes its PID into the lock file, then repeatedly
# feeds the orchestration prompt to the assistant CLI, appending JSONL events
# to the live log.  Terminates on SIGTERM.
set -eu
RALPH_DIR="${RALPH_PROJECT_DIR:-.}/.ralph"
echo $$ > "$RALPH_DIR/claude.lock"
trap 'rm -f "$RALPH_DIR/claude.lock"; exit 0' TERM INT
while :; do
    claude -p --output-format stream-json \
        < "$RALPH_DIR/prompts/orchestration.md" \
        >> "$RALPH_DIR/claude_output.jsonl" || true
    sleep 2
done
"#;

const ORCHESTRATION_PROMPT: &str = r#"You are working an autonomous coding loop.

Read the current assignment from {{assignment_path}} and work the next step.
When the step is done, update the assignment file with the new next_step.

@../projects/default/execute.md
"#;

const RESUME_PROMPT: &str = r#"You were interrupted by the operator.

Re-read {{assignment_path}}, then continue the loop described in
{{execute_path}}.  Operator feedback follows below; treat it as the highest
priority instruction.
"#;

const EXECUTE_MD: &str = r#"# Execution loop

1. Pick the next step from the assignment.
2. Make the change, run the tests.
3. Update the assignment file: set next_step, and pull_request_url once a PR
   exists.
"#;

/// Scaffold `.ralph/` under `root`.  Existing files are skipped unless
/// `force`; with `dry_run` nothing is written and every decision is printed.
pub fn run(
    root: &Path,
    agent: Option<AgentKind>,
    provider: Option<TrackerProvider>,
    dry_run: bool,
    force: bool,
) -> anyhow::Result<()> {
    let ralph = root.join(".ralph");

    let settings = settings_json(agent, provider);
    let files: Vec<(std::path::PathBuf, String, bool)> = vec![
        (ralph.join("settings.json"), settings, false),
        (ralph.join("ralph.sh"), HARNESS_SCRIPT.to_string(), true),
        (
            ralph.join("prompts/orchestration.md"),
            ORCHESTRATION_PROMPT.to_string(),
            false,
        ),
        (ralph.join("prompts/resume.md"), RESUME_PROMPT.to_string(), false),
        (
            ralph.join("projects/default/execute.md"),
            EXECUTE_MD.to_string(),
            false,
        ),
    ];

    for (path, content, executable) in files {
        let exists = path.exists();
        if exists && !force {
            println!("skip   {} (exists)", path.display());
            continue;
        }
        let verb = if exists { "update" } else { "create" };
        if dry_run {
            println!("would {verb} {}", path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&path, &content)
            .with_context(|| format!("writing {}", path.display()))?;
        if executable {
            mark_executable(&path)?;
        }
        println!("{verb} {}", path.display());
    }

    if !dry_run {
        std::fs::create_dir_all(ralph.join("archive"))
            .with_context(|| format!("creating {}", ralph.join("archive").display()))?;
    }
    Ok(())
}

fn settings_json(agent: Option<AgentKind>, provider: Option<TrackerProvider>) -> String {
    let mut settings = serde_json::json!({
        "agent": { "type": agent.unwrap_or_default().to_string() },
        "variables": {},
    });
    if let Some(provider) = provider {
        settings["task_management"] =
            serde_json::json!({ "provider": provider.to_string(), "provider_config": {} });
    }
    format!("{:#}\n", settings)
}

fn mark_executable(path: &Path) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("chmod {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
