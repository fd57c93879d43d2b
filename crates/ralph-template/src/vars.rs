// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `{{variable}}` substitution, applied after include expansion.

use std::collections::HashMap;

use regex::Regex;

/// Variable names the engine computes from context instead of the
/// configuration map.
pub const SPECIAL_VARS: [&str; 2] = ["execute_path", "assignment_path"];

/// Context-derived values for the special variables.
#[derive(Debug, Clone)]
pub struct SpecialVars {
    pub execute_path: String,
    pub assignment_path: String,
}

impl SpecialVars {
    /// Paths for the active project, relative to the project root.
    pub fn for_active_project(session_dir: &str, active: &str) -> Self {
        Self {
            execute_path: format!("{session_dir}/projects/{active}/execute.md"),
            assignment_path: format!("{session_dir}/projects/{active}/assignment.json"),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "execute_path" => Some(&self.execute_path),
            "assignment_path" => Some(&self.assignment_path),
            _ => None,
        }
    }
}

fn var_pattern() -> Regex {
    Regex::new(r"\{\{([^{}]*)\}\}").expect("variable pattern is valid")
}

/// Substitute `{{name}}` placeholders.  Names are trimmed.  Special variables
/// come from `specials`; everything else from `vars`.  Unknown placeholders
/// are left literal and reported through `warn`, once per occurrence.
pub fn substitute_with_sink(
    content: &str,
    vars: &HashMap<String, String>,
    specials: &SpecialVars,
    warn: &mut dyn FnMut(&str),
) -> String {
    let pattern = var_pattern();
    pattern
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let name = caps[1].trim();
            if let Some(value) = specials.get(name) {
                value.to_string()
            } else if let Some(value) = vars.get(name) {
                value.clone()
            } else {
                warn(&format!("unknown template variable {{{{{name}}}}}"));
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// [`substitute_with_sink`] with warnings routed to the log.
pub fn substitute(
    content: &str,
    vars: &HashMap<String, String>,
    specials: &SpecialVars,
) -> String {
    substitute_with_sink(content, vars, specials, &mut |msg| {
        tracing::warn!("{msg}");
    })
}

/// All distinct `{{name}}` tokens in order of first appearance.
pub fn extract_variable_names(content: &str) -> Vec<String> {
    let pattern = var_pattern();
    let mut seen = Vec::new();
    for caps in pattern.captures_iter(content) {
        let name = caps[1].trim().to_string();
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// True if the text still contains any `{{...}}` token.
pub fn has_unsubstituted(content: &str) -> bool {
    var_pattern().is_match(content)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub missing: Vec<String>,
}

/// Check that every variable a template references is either special or
/// present in `vars`.
pub fn validate(content: &str, vars: &HashMap<String, String>) -> ValidationReport {
    let missing: Vec<String> = extract_variable_names(content)
        .into_iter()
        .filter(|name| !SPECIAL_VARS.contains(&name.as_str()) && !vars.contains_key(name))
        .collect();
    ValidationReport {
        valid: missing.is_empty(),
        missing,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn specials() -> SpecialVars {
        SpecialVars::for_active_project(".ralph", "default")
    }

    #[test]
    fn simple_substitution() {
        let out = substitute("Hello {{name}}!", &vars(&[("name", "world")]), &specials());
        assert_eq!(out, "Hello world!");
    }

    #[test]
    fn names_are_trimmed() {
        let out = substitute("{{ name }}", &vars(&[("name", "v")]), &specials());
        assert_eq!(out, "v");
    }

    #[test]
    fn special_execute_path() {
        let out = substitute("run {{execute_path}}", &vars(&[]), &specials());
        assert_eq!(out, "run .ralph/projects/default/execute.md");
    }

    #[test]
    fn special_assignment_path() {
        let s = SpecialVars::for_active_project(".ralph", "billing");
        let out = substitute("{{assignment_path}}", &vars(&[]), &s);
        assert_eq!(out, ".ralph/projects/billing/assignment.json");
    }

    #[test]
    fn special_wins_over_config_variable() {
        let out = substitute(
            "{{execute_path}}",
            &vars(&[("execute_path", "shadowed")]),
            &specials(),
        );
        assert_eq!(out, ".ralph/projects/default/execute.md");
    }

    #[test]
    fn unknown_placeholder_stays_literal_and_warns_per_occurrence() {
        let mut warnings = Vec::new();
        let out = substitute_with_sink(
            "{{missing}} and {{missing}}",
            &vars(&[]),
            &specials(),
            &mut |m| warnings.push(m.to_string()),
        );
        assert_eq!(out, "{{missing}} and {{missing}}");
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("missing"));
    }

    #[test]
    fn substitution_is_idempotent_without_tokens() {
        let content = "plain text, no tokens";
        let out = substitute(content, &vars(&[("a", "b")]), &specials());
        assert_eq!(out, content);
    }

    #[test]
    fn extract_names_ordered_and_deduped() {
        let names = extract_variable_names("{{b}} {{a}} {{b}} {{ c }}");
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn has_unsubstituted_detects_leftovers() {
        assert!(has_unsubstituted("still {{here}}"));
        assert!(!has_unsubstituted("all done"));
    }

    #[test]
    fn validate_reports_missing_minus_specials() {
        let report = validate(
            "{{execute_path}} {{branch}} {{pr}}",
            &vars(&[("branch", "main")]),
        );
        assert!(!report.valid);
        assert_eq!(report.missing, vec!["pr"]);
    }

    #[test]
    fn validate_ok_when_everything_known() {
        let report = validate("{{assignment_path}} {{x}}", &vars(&[("x", "1")]));
        assert!(report.valid);
        assert!(report.missing.is_empty());
    }
}
