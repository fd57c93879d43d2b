// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Harness lifecycle control.
//!
//! The harness is spawned detached and rediscovered through the PID lock, so
//! it survives a crash of the TUI and a fresh Ralph can re-attach.  The
//! controller never supervises the child in-process; liveness is always the
//! lock file plus a signal-0 probe.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use ralph_config::Config;
use ralph_template::{SpecialVars, TemplateError, EXIT_MISSING_INCLUDE};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{archive, lock, paths::SessionPaths};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Running,
    Stopping,
    Resuming,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ControllerState::Idle => "idle",
            ControllerState::Starting => "starting",
            ControllerState::Running => "running",
            ControllerState::Stopping => "stopping",
            ControllerState::Resuming => "resuming",
        };
        write!(f, "{s}")
    }
}

pub struct ProcessController {
    config: Arc<Config>,
    paths: SessionPaths,
    state: ControllerState,
}

impl ProcessController {
    pub fn new(config: Arc<Config>, paths: SessionPaths) -> Self {
        // A live lock from a previous Ralph process means the harness is
        // already running; a stale lock reads as idle.
        let state = if lock::is_running_live(paths.lock()) {
            ControllerState::Running
        } else {
            ControllerState::Idle
        };
        Self {
            config,
            paths,
            state,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Lock-file liveness: present and its PID answers signal 0.
    pub fn is_running_live(&self) -> bool {
        lock::is_running_live(self.paths.lock())
    }

    /// Reconcile the state with the lock file.  Driven by the background
    /// liveness timer; recovers from the harness dying out-of-band.
    pub fn refresh(&mut self) {
        if matches!(
            self.state,
            ControllerState::Starting | ControllerState::Stopping | ControllerState::Resuming
        ) {
            return;
        }
        let live = self.is_running_live();
        match (self.state, live) {
            (ControllerState::Running, false) => {
                info!("harness is no longer alive; back to idle");
                self.state = ControllerState::Idle;
            }
            (ControllerState::Idle, true) => {
                info!("harness discovered via lock file");
                self.state = ControllerState::Running;
            }
            _ => {}
        }
    }

    fn reject_if_busy(&self) -> anyhow::Result<()> {
        if matches!(
            self.state,
            ControllerState::Starting | ControllerState::Stopping | ControllerState::Resuming
        ) {
            bail!("another agent operation is in progress ({})", self.state);
        }
        Ok(())
    }

    /// Start the harness as a detached child and wait for its lock.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.reject_if_busy()?;
        if self.is_running_live() {
            bail!("agent is already running (live PID in lock)");
        }

        let script = self.paths.resolve(&self.config.process.agent_script);
        if !script.is_file() {
            bail!(
                "agent script not found: {} — run `ralph init` to scaffold the project",
                script.display()
            );
        }
        let orchestration = self
            .paths
            .resolve(&self.config.agent.orchestration_prompt);
        if !orchestration.is_file() {
            bail!(
                "orchestration prompt not found: {} — run `ralph init` to scaffold the project",
                orchestration.display()
            );
        }
        let execute = self.paths.execute_path();
        if !execute.is_file() {
            bail!(
                "project file not found: {} — run `ralph init` to scaffold the project",
                execute.display()
            );
        }

        self.state = ControllerState::Starting;
        let spawned = self.spawn_detached(&script).await;
        if let Err(err) = spawned {
            self.state = ControllerState::Idle;
            return Err(err);
        }

        tokio::time::sleep(Duration::from_millis(self.config.process.startup_grace_ms)).await;
        if self.is_running_live() {
            info!("harness started");
            self.state = ControllerState::Running;
            Ok(())
        } else {
            // The script may still be running; nothing is cleaned up here.
            self.state = ControllerState::Idle;
            bail!("agent failed to start; another instance may be running, or the lock was never written")
        }
    }

    async fn spawn_detached(&self, script: &std::path::Path) -> anyhow::Result<()> {
        debug!(script = %script.display(), "spawning harness");
        let mut cmd = Command::new(script);
        cmd.current_dir(self.paths.project_root())
            .env("RALPH_PROJECT_DIR", self.paths.project_root())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // Own process group: the harness must survive this process exiting,
        // and must not receive the TUI's terminal signals.
        #[cfg(unix)]
        cmd.process_group(0);
        let child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", script.display()))?;
        // Dropping the handle is the detach; liveness comes from the lock.
        drop(child);
        Ok(())
    }

    /// Best-effort stop: SIGTERM the locked PID, sweep the process family by
    /// command-line pattern, delete the lock.  Always ends idle; calling it
    /// again is a no-op.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        if matches!(
            self.state,
            ControllerState::Starting | ControllerState::Resuming
        ) {
            bail!("another agent operation is in progress ({})", self.state);
        }
        self.state = ControllerState::Stopping;
        self.stop_inner().await;
        self.state = ControllerState::Idle;
        Ok(())
    }

    async fn stop_inner(&self) {
        if let Some(pid) = lock::read_pid(self.paths.lock()) {
            if pid != std::process::id() as i32 {
                debug!(pid, "sending SIGTERM");
                #[cfg(unix)]
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
        for pattern in &self.config.process.kill_patterns {
            let swept = Command::new("pkill")
                .arg("-f")
                .arg(pattern)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if let Err(err) = swept {
                warn!(pattern = %pattern, "pkill sweep failed: {err}");
            }
        }
        if let Err(err) = lock::remove(self.paths.lock()) {
            warn!("could not remove lock: {err}");
        }
        // Give the family a moment to terminate before anything reuses the
        // live log or the lock.
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    /// Interrupt the running harness and relaunch the assistant with a
    /// resume token, feeding it the resume prompt plus the user's feedback.
    pub async fn resume(
        &mut self,
        session_id: Option<&str>,
        feedback: &str,
    ) -> anyhow::Result<()> {
        if self.state != ControllerState::Running {
            bail!("resume is only valid while the agent is running");
        }
        self.state = ControllerState::Resuming;
        let outcome = self.resume_inner(session_id, feedback).await;
        match outcome {
            Ok(()) => {
                self.state = ControllerState::Running;
                Ok(())
            }
            Err(err) => {
                self.state = ControllerState::Idle;
                Err(err)
            }
        }
    }

    async fn resume_inner(
        &mut self,
        session_id: Option<&str>,
        feedback: &str,
    ) -> anyhow::Result<()> {
        self.stop_inner().await;

        let template = self.paths.resolve(&self.config.agent.resume_prompt);
        let specials = SpecialVars::for_active_project(
            &self.config.paths.session_dir,
            self.paths.active_project(),
        );
        let prompt =
            match ralph_template::process_template(&template, &self.config.variables, &specials) {
                Ok(text) => text,
                Err(err) => return Err(template_error(err)),
            };
        let full = if feedback.trim().is_empty() {
            prompt
        } else {
            format!("{prompt}\n\n{feedback}")
        };

        // The synthetic user event lands in the log before the child spawns,
        // so the TUI always shows what was sent, ahead of any child output.
        archive::ensure_live_log(&self.paths)?;
        append_user_event(&self.paths, &full)?;

        let mut cmd = Command::new(&self.config.process.resume_command);
        cmd.args(&self.config.process.resume_args);
        if let Some(id) = session_id {
            cmd.arg("--resume").arg(id);
        }
        cmd.current_dir(self.paths.project_root())
            .env("RALPH_PROJECT_DIR", self.paths.project_root())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.config.process.resume_command))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(full.as_bytes())
                .await
                .context("piping resume prompt")?;
            stdin.shutdown().await.ok();
        }
        let pid = child.id().context("resumed child has no PID")?;
        lock::write_pid(self.paths.lock(), pid)?;
        drop(child);

        tokio::time::sleep(Duration::from_millis(self.config.process.startup_grace_ms)).await;
        if self.is_running_live() {
            info!(pid, "agent resumed");
            Ok(())
        } else {
            bail!("agent failed to resume; the assistant exited before the liveness check")
        }
    }
}

/// Append a synthetic `user` event with the given text to the live log.
pub fn append_user_event(paths: &SessionPaths, text: &str) -> anyhow::Result<()> {
    let event = json!({
        "type": "user",
        "timestamp": Utc::now().to_rfc3339(),
        "message": { "content": [ { "type": "text", "text": text } ] },
    });
    let line = format!("{event}\n");
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.live_log())
        .with_context(|| format!("opening live log {}", paths.live_log().display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("appending to {}", paths.live_log().display()))
}

fn template_error(err: TemplateError) -> anyhow::Error {
    if err.exit_code() == EXIT_MISSING_INCLUDE {
        anyhow::anyhow!("missing include file — {err}; fix the template and press start again")
    } else {
        err.into()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
