// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Live-log archival.
//!
//! Archive file names carry a sortable UTC timestamp:
//!
//!   `claude_output.YYYYMMDD_HHMMSS_mmm.jsonl`
//!
//! so reverse-lexicographic order is reverse-chronological order and the
//! listing needs no stat calls.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use tracing::info;

use crate::paths::SessionPaths;

/// One archived session log.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub file_name: String,
    /// Parsed from the file name; `None` for unrecognised formats.
    pub timestamp: Option<DateTime<Utc>>,
}

impl ArchiveEntry {
    /// Human-readable label for the session picker.
    pub fn display(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => self.file_name.clone(),
        }
    }
}

fn live_log_stem(paths: &SessionPaths) -> String {
    let name = paths
        .live_log()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("claude_output.jsonl");
    name.strip_suffix(".jsonl").unwrap_or(name).to_string()
}

fn archive_name(stem: &str, at: DateTime<Utc>) -> String {
    format!("{stem}.{}.jsonl", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Move a non-empty live log into the archive and create a fresh empty one.
///
/// Returns the archive path, or `None` when the live log was missing or
/// empty (in which case nothing is renamed, which is what makes a second
/// archive call on the same log harmless).
pub fn archive_live_log(paths: &SessionPaths) -> anyhow::Result<Option<PathBuf>> {
    archive_live_log_at(paths, Utc::now())
}

fn archive_live_log_at(
    paths: &SessionPaths,
    at: DateTime<Utc>,
) -> anyhow::Result<Option<PathBuf>> {
    let live = paths.live_log();
    match std::fs::metadata(live) {
        Ok(meta) if meta.len() > 0 => {}
        _ => return Ok(None),
    }

    std::fs::create_dir_all(paths.archive_dir()).with_context(|| {
        format!("creating archive directory {}", paths.archive_dir().display())
    })?;
    let target = paths
        .archive_dir()
        .join(archive_name(&live_log_stem(paths), at));
    // Same filesystem, so the rename is atomic; the tailer sees the live log
    // shrink to zero and resets.
    std::fs::rename(live, &target)
        .with_context(|| format!("archiving {} -> {}", live.display(), target.display()))?;
    info!(archive = %target.display(), "session archived");

    ensure_live_log(paths)?;
    Ok(Some(target))
}

/// Create the live log as an empty file (and its parent directory) if it
/// does not exist.
pub fn ensure_live_log(paths: &SessionPaths) -> anyhow::Result<()> {
    let live = paths.live_log();
    if let Some(parent) = live.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !live.exists() {
        std::fs::write(live, b"")
            .with_context(|| format!("creating live log {}", live.display()))?;
    }
    Ok(())
}

/// List archived sessions, newest first.
pub fn list_archives(paths: &SessionPaths) -> anyhow::Result<Vec<ArchiveEntry>> {
    let stem = live_log_stem(paths);
    let dir = paths.archive_dir();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("listing {}", dir.display()))
        }
    };

    let ts_pattern = Regex::new(&format!(
        r"^{}\.(\d{{4}})(\d{{2}})(\d{{2}})_(\d{{2}})(\d{{2}})(\d{{2}})_(\d{{3}})\.jsonl$",
        regex::escape(&stem)
    ))
    .expect("archive pattern is valid");

    let mut archives = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.starts_with(&format!("{stem}.")) || !file_name.ends_with(".jsonl") {
            continue;
        }
        archives.push(ArchiveEntry {
            path: entry.path(),
            timestamp: parse_timestamp(&ts_pattern, &file_name),
            file_name,
        });
    }
    // Reverse lexicographic == reverse chronological for the sortable names.
    archives.sort_by(|a, b| b.file_name.cmp(&a.file_name));
    Ok(archives)
}

fn parse_timestamp(pattern: &Regex, file_name: &str) -> Option<DateTime<Utc>> {
    let caps = pattern.captures(file_name)?;
    let num = |i: usize| caps[i].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, num(2)?, num(3)?)?;
    let time = date.and_hms_milli_opt(num(4)?, num(5)?, num(6)?, num(7)?)?;
    Some(Utc.from_utc_datetime(&time))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
