// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{AgentKind, Config};

/// Typed CLI overrides applied as the final configuration layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `-s` / `-S`: force sidebar visibility.
    pub sidebar: Option<bool>,
    /// `-a TYPE`: override the agent type.
    pub agent: Option<AgentKind>,
    /// `-i ID`: pre-select a tracker issue; exposed as `{{issue}}`.
    pub issue: Option<String>,
}

/// Load configuration by merging all discovered JSON layers in order (later
/// wins): built-in defaults, global user config, project settings + local
/// override, active-project settings + local override, CLI overrides.
/// Unknown enum values (agent type, tracker provider) are hard errors; the
/// serde message lists the valid set.
pub fn load(project_root: &Path, overrides: &CliOverrides) -> anyhow::Result<Config> {
    let mut merged =
        serde_json::to_value(Config::default()).context("serialising built-in defaults")?;

    // Global user config.  May relocate the session dir, so it merges before
    // the project layers are looked up.
    if let Some(cfg) = dirs::config_dir() {
        merge_file(&mut merged, &cfg.join("ralph/settings.json"))?;
    }

    let session_dir = merged
        .pointer("/paths/session_dir")
        .and_then(Value::as_str)
        .unwrap_or(".ralph")
        .to_string();
    let session = project_root.join(&session_dir);
    merge_file(&mut merged, &session.join("settings.json"))?;
    merge_file(&mut merged, &session.join("settings.local.json"))?;

    // The active project is resolved from the layers merged so far.
    let active = merged
        .pointer("/paths/active_project")
        .and_then(Value::as_str)
        .unwrap_or("default")
        .to_string();
    let project = session.join("projects").join(&active);
    merge_file(&mut merged, &project.join("settings.json"))?;
    merge_file(&mut merged, &project.join("settings.local.json"))?;

    let mut config: Config =
        serde_json::from_value(merged).context("validating merged configuration")?;

    if let Some(sidebar) = overrides.sidebar {
        config.display.sidebar = sidebar;
    }
    if let Some(agent) = overrides.agent {
        config.agent.agent_type = agent;
    }
    if let Some(issue) = &overrides.issue {
        config.variables.insert("issue".into(), issue.clone());
    }

    Ok(config)
}

fn merge_file(merged: &mut Value, path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    debug!(path = %path.display(), "loading settings layer");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let layer: Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    merge_layer(merged, layer);
    Ok(())
}

/// Merge one settings layer into the accumulated value; the layer wins.
///
/// Top-level keys replace wholesale, except `variables` and `paths` (deep
/// merge) and `task_management` (field-wise, with `provider_config` deep).
fn merge_layer(dst: &mut Value, src: Value) {
    let (Value::Object(d), Value::Object(s)) = (dst, src) else {
        return;
    };
    for (key, value) in s {
        match key.as_str() {
            "variables" | "paths" => {
                deep_merge(d.entry(key).or_insert(Value::Object(Map::new())), value)
            }
            "task_management" => {
                let entry = d.entry(key).or_insert(Value::Object(Map::new()));
                let (Value::Object(de), Value::Object(se)) = (entry, value) else {
                    continue;
                };
                for (k, v) in se {
                    if k == "provider_config" {
                        deep_merge(de.entry(k).or_insert(Value::Object(Map::new())), v);
                    } else {
                        de.insert(k, v);
                    }
                }
            }
            _ => {
                d.insert(key, value);
            }
        }
    }
}

/// Recursive object merge; `src` wins on scalar conflicts.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => {
            for (k, v) in s {
                deep_merge(d.entry(k).or_insert(Value::Object(Map::new())), v);
            }
        }
        (dst, src) => *dst = src,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn val(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn deep_merge_scalar_src_wins() {
        let mut dst = val(r#"{"x":1}"#);
        deep_merge(&mut dst, val(r#"{"x":2}"#));
        assert_eq!(dst["x"], 2);
    }

    #[test]
    fn deep_merge_preserves_keys_not_in_src() {
        let mut dst = val(r#"{"a":1,"b":2}"#);
        deep_merge(&mut dst, val(r#"{"b":99}"#));
        assert_eq!(dst["a"], 1);
        assert_eq!(dst["b"], 99);
    }

    #[test]
    fn merge_layer_replaces_display_wholesale() {
        // Non-deep sections are replaced per top-level key: a layer that sets
        // only `display.sidebar` drops the accumulated `display.timestamps`.
        let mut dst = val(r#"{"display":{"sidebar":true,"timestamps":true}}"#);
        merge_layer(&mut dst, val(r#"{"display":{"sidebar":false}}"#));
        assert_eq!(dst["display"]["sidebar"], false);
        assert!(dst["display"].get("timestamps").is_none());
    }

    #[test]
    fn merge_layer_deep_merges_variables() {
        let mut dst = val(r#"{"variables":{"a":"1","b":"2"}}"#);
        merge_layer(&mut dst, val(r#"{"variables":{"b":"9"}}"#));
        assert_eq!(dst["variables"]["a"], "1");
        assert_eq!(dst["variables"]["b"], "9");
    }

    #[test]
    fn merge_layer_deep_merges_paths() {
        let mut dst =
            val(r#"{"paths":{"session_dir":".ralph","lock_name":"claude.lock"}}"#);
        merge_layer(&mut dst, val(r#"{"paths":{"lock_name":"agent.lock"}}"#));
        assert_eq!(dst["paths"]["session_dir"], ".ralph");
        assert_eq!(dst["paths"]["lock_name"], "agent.lock");
    }

    #[test]
    fn merge_layer_deep_merges_provider_config_only() {
        let mut dst = val(
            r#"{"task_management":{"provider":"jira","provider_config":{"url":"x","token":"t"}}}"#,
        );
        merge_layer(
            &mut dst,
            val(r#"{"task_management":{"provider_config":{"token":"u"}}}"#),
        );
        assert_eq!(dst["task_management"]["provider"], "jira");
        assert_eq!(dst["task_management"]["provider_config"]["url"], "x");
        assert_eq!(dst["task_management"]["provider_config"]["token"], "u");
    }

    #[test]
    fn load_missing_layers_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(cfg.paths.session_dir, ".ralph");
    }

    #[test]
    fn load_project_settings_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join(".ralph");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(
            session.join("settings.json"),
            r#"{"process":{"tail_poll_ms":250}}"#,
        )
        .unwrap();
        let cfg = load(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(cfg.process.tail_poll_ms, 250);
    }

    #[test]
    fn load_local_settings_beat_project_settings() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join(".ralph");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(
            session.join("settings.json"),
            r#"{"variables":{"branch":"main","pr":"1"}}"#,
        )
        .unwrap();
        std::fs::write(
            session.join("settings.local.json"),
            r#"{"variables":{"pr":"42"}}"#,
        )
        .unwrap();
        let cfg = load(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(cfg.variables["branch"], "main");
        assert_eq!(cfg.variables["pr"], "42");
    }

    #[test]
    fn load_active_project_layers_apply() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join(".ralph");
        std::fs::create_dir_all(session.join("projects/billing")).unwrap();
        std::fs::write(
            session.join("settings.json"),
            r#"{"paths":{"active_project":"billing"}}"#,
        )
        .unwrap();
        std::fs::write(
            session.join("projects/billing/settings.json"),
            r#"{"variables":{"scope":"billing"}}"#,
        )
        .unwrap();
        let cfg = load(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(cfg.paths.active_project, "billing");
        assert_eq!(cfg.variables["scope"], "billing");
    }

    #[test]
    fn load_cli_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join(".ralph");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join("settings.json"), r#"{"display":{"sidebar":true}}"#)
            .unwrap();
        let overrides = CliOverrides {
            sidebar: Some(false),
            agent: Some(AgentKind::Codex),
            issue: Some("RALPH-7".into()),
        };
        let cfg = load(dir.path(), &overrides).unwrap();
        assert!(!cfg.display.sidebar);
        assert_eq!(cfg.agent.agent_type, AgentKind::Codex);
        assert_eq!(cfg.variables["issue"], "RALPH-7");
    }

    #[test]
    fn load_invalid_enum_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join(".ralph");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(
            session.join("settings.json"),
            r#"{"task_management":{"provider":"trello"}}"#,
        )
        .unwrap();
        assert!(load(dir.path(), &CliOverrides::default()).is_err());
    }

    #[test]
    fn load_malformed_json_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join(".ralph");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join("settings.json"), "{not json").unwrap();
        assert!(load(dir.path(), &CliOverrides::default()).is_err());
    }
}
