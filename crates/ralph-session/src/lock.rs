// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The harness PID lock.
//!
//! The lock file contains a single decimal PID and is the only coordination
//! mechanism between Ralph processes: present + live PID means a harness is
//! running; present + dead PID is a stale lock left by a crash and reads as
//! not-running.

use std::path::Path;

use anyhow::Context;

/// Parse the PID stored in the lock file, if any.
pub fn read_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .filter(|pid| *pid > 0)
}

pub fn write_pid(path: &Path, pid: u32) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, format!("{pid}\n"))
        .with_context(|| format!("writing lock {}", path.display()))
}

/// Delete the lock file; a missing file is fine.
pub fn remove(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("removing lock {}", path.display()))
        }
    }
}

/// Existence probe via signal 0: no signal is delivered, but the errno tells
/// us whether the PID is alive.
pub fn pid_alive(pid: i32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::kill(pid, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// True when the lock holds the PID of a live process.
pub fn is_running_live(path: &Path) -> bool {
    read_pid(path).map(pid_alive).unwrap_or(false)
}

/// True for a lock file whose PID is no longer alive.
pub fn is_stale(path: &Path) -> bool {
    match read_pid(path) {
        Some(pid) => !pid_alive(pid),
        None => path.exists(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
