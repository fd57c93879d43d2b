// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Append-only log follower with rotation detection.
//!
//! The tailer polls the file size instead of using an inotify-style watcher;
//! watchers miss events for files appended by detached processes and on
//! network filesystems, and a 500 ms poll is plenty for a conversation log.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What the tailer observed on one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// New complete lines, trimmed, empties skipped.
    Lines(Vec<String>),
    /// The file shrank or the tailer was pointed at a new path; all
    /// downstream state derived from earlier lines must be discarded
    /// before any further `Lines` are applied.
    Reset,
    /// The file does not exist (reported once until it appears).
    NotFound,
    /// A transient read error; the stream continues on the next poll.
    StreamError(String),
}

/// Polling state for one followed file.
#[derive(Debug)]
pub struct Tailer {
    path: PathBuf,
    offset: u64,
    /// Bytes past the last newline, kept until the line completes.
    carry: String,
    missing_reported: bool,
}

impl Tailer {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            carry: String::new(),
            missing_reported: false,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Point the tailer at a different file.  The caller must treat this as
    /// a full reset; the next poll re-reads the new file from offset 0.
    pub fn retarget(&mut self, path: PathBuf) {
        debug!(path = %path.display(), "tailer retarget");
        self.path = path;
        self.offset = 0;
        self.carry.clear();
        self.missing_reported = false;
    }

    /// One poll step: stat, detect rotation, read the new suffix.
    pub async fn poll(&mut self) -> Vec<TailEvent> {
        let mut events = Vec::new();

        let meta = match fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if !self.missing_reported {
                    events.push(TailEvent::NotFound);
                    self.missing_reported = true;
                }
                return events;
            }
            Err(err) => {
                events.push(TailEvent::StreamError(err.to_string()));
                return events;
            }
        };
        self.missing_reported = false;

        let size = meta.len();
        if size < self.offset {
            // Rotation/truncation: downstream state is invalid.
            debug!(size, offset = self.offset, "log rotated, resetting");
            self.offset = 0;
            self.carry.clear();
            events.push(TailEvent::Reset);
        }
        if size == self.offset {
            return events;
        }

        match self.read_from(self.offset, size).await {
            Ok(bytes) => {
                self.offset = size;
                self.carry.push_str(&String::from_utf8_lossy(&bytes));
                let lines = self.drain_lines();
                if !lines.is_empty() {
                    events.push(TailEvent::Lines(lines));
                }
            }
            Err(err) => {
                warn!(path = %self.path.display(), "tail read failed: {err}");
                events.push(TailEvent::StreamError(err.to_string()));
            }
        }
        events
    }

    async fn read_from(&self, from: u64, to: u64) -> std::io::Result<Vec<u8>> {
        let mut file = fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(from)).await?;
        let mut buf = vec![0u8; (to - from) as usize];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Split complete lines off the carry buffer.
    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.carry.find('\n') {
            let line = self.carry[..pos].trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
            self.carry.drain(..=pos);
        }
        lines
    }
}

/// Handle to a spawned tailer task.
pub struct TailerHandle {
    /// Observed events, in file-offset order.
    pub events: mpsc::Receiver<TailEvent>,
    /// Send a new path to follow (e.g. an archived session).
    pub retarget: mpsc::Sender<PathBuf>,
}

/// Spawn the background polling task.
pub fn spawn(path: PathBuf, poll_interval: Duration) -> TailerHandle {
    let (event_tx, events) = mpsc::channel::<TailEvent>(256);
    let (retarget_tx, mut retarget_rx) = mpsc::channel::<PathBuf>(4);

    tokio::spawn(async move {
        let mut tailer = Tailer::new(path);
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                Some(new_path) = retarget_rx.recv() => {
                    tailer.retarget(new_path);
                    // Reset reaches the consumer before any line of the new file.
                    if event_tx.send(TailEvent::Reset).await.is_err() {
                        return;
                    }
                }
                _ = ticker.tick() => {}
            }
            for event in tailer.poll().await {
                if event_tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    });

    TailerHandle {
        events,
        retarget: retarget_tx,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
