// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Task-tracker adapters.
//!
//! The trackers themselves (kanban boards, issue trackers) are external
//! collaborators; this crate defines the adapter interface the view model
//! consumes and the registry that selects an adapter from configuration.
//! An adapter whose integration is not configured reports itself absent and
//! the sidebar simply shows the raw assignment instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ralph_config::TrackerProvider;
use serde_json::Value;

/// Task metadata shown in the sidebar next to the assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: String,
    pub title: String,
    pub status: String,
    pub task_type: Option<String>,
    pub priority: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> TrackerProvider;

    /// True when the adapter has enough configuration to answer queries.
    fn is_present(&self) -> bool;

    /// Fetch one task by its tracker-native id.
    async fn fetch_task(&self, id: &str) -> anyhow::Result<TaskInfo>;
}

/// Adapter placeholder for a provider whose integration is not configured.
struct UnconfiguredTracker {
    provider: TrackerProvider,
}

#[async_trait]
impl TaskTracker for UnconfiguredTracker {
    fn provider(&self) -> TrackerProvider {
        self.provider
    }

    fn is_present(&self) -> bool {
        false
    }

    async fn fetch_task(&self, id: &str) -> anyhow::Result<TaskInfo> {
        anyhow::bail!(
            "tracker '{}' is not configured (task {id}); set task_management.provider_config",
            self.provider
        )
    }
}

/// Select the adapter for the configured provider.  `None` when task
/// management is disabled entirely.
pub fn from_config(
    provider: Option<TrackerProvider>,
    _provider_config: &Value,
) -> Option<Box<dyn TaskTracker>> {
    provider.map(|provider| Box::new(UnconfiguredTracker { provider }) as Box<dyn TaskTracker>)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
