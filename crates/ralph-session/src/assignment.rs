// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// The small JSON document the harness uses to persist the currently
/// assigned task.  Written by the agent, read here, deleted when the work is
/// complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task_id: String,
    pub next_step: String,
    pub pull_request_url: Option<String>,
}

/// Read the assignment file.  Absence and mid-write races (the agent
/// overwrites the file) both read as "no assignment".
pub fn load(path: &Path) -> Option<Assignment> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Delete the assignment once the work is done; a missing file is fine.
pub fn remove(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("removing assignment {}", path.display()))
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
