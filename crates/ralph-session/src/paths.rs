// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use ralph_config::Config;

/// Resolved locations of everything under the session state directory.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    project_root: PathBuf,
    session_dir: PathBuf,
    live_log: PathBuf,
    lock: PathBuf,
    archive_dir: PathBuf,
    active_project: String,
}

impl SessionPaths {
    pub fn new(project_root: &Path, config: &Config) -> Self {
        let session_dir = project_root.join(&config.paths.session_dir);
        Self {
            project_root: project_root.to_path_buf(),
            live_log: session_dir.join(&config.paths.live_log_name),
            lock: session_dir.join(&config.paths.lock_name),
            archive_dir: session_dir.join(&config.paths.archive_dir_name),
            active_project: config.paths.active_project.clone(),
            session_dir,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn live_log(&self) -> &Path {
        &self.live_log
    }

    /// Point the live-log path somewhere else (`--file` override).
    pub fn set_live_log(&mut self, path: PathBuf) {
        self.live_log = path;
    }

    pub fn lock(&self) -> &Path {
        &self.lock
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn active_project(&self) -> &str {
        &self.active_project
    }

    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.session_dir.join("projects").join(name)
    }

    /// `execute.md` of the active project.
    pub fn execute_path(&self) -> PathBuf {
        self.project_dir(&self.active_project).join("execute.md")
    }

    /// `assignment.json` of the active project.
    pub fn assignment_path(&self) -> PathBuf {
        self.project_dir(&self.active_project).join("assignment.json")
    }

    /// Resolve a config-relative path (agent script, prompt templates)
    /// against the project root.
    pub fn resolve(&self, configured: &str) -> PathBuf {
        let p = Path::new(configured);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_layout() {
        let config = Config::default();
        let paths = SessionPaths::new(Path::new("/work/repo"), &config);
        assert_eq!(
            paths.live_log(),
            Path::new("/work/repo/.ralph/claude_output.jsonl")
        );
        assert_eq!(paths.lock(), Path::new("/work/repo/.ralph/claude.lock"));
        assert_eq!(paths.archive_dir(), Path::new("/work/repo/.ralph/archive"));
        assert_eq!(
            paths.execute_path(),
            Path::new("/work/repo/.ralph/projects/default/execute.md")
        );
        assert_eq!(
            paths.assignment_path(),
            Path::new("/work/repo/.ralph/projects/default/assignment.json")
        );
    }

    #[test]
    fn active_project_changes_project_paths() {
        let mut config = Config::default();
        config.paths.active_project = "billing".into();
        let paths = SessionPaths::new(Path::new("/r"), &config);
        assert_eq!(
            paths.execute_path(),
            Path::new("/r/.ralph/projects/billing/execute.md")
        );
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let paths = SessionPaths::new(Path::new("/r"), &Config::default());
        assert_eq!(paths.resolve("/abs/script.sh"), Path::new("/abs/script.sh"));
        assert_eq!(
            paths.resolve(".ralph/ralph.sh"),
            Path::new("/r/.ralph/ralph.sh")
        );
    }
}
