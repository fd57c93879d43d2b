// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Prompt template processing: `@file` includes, then `{{var}}` substitution.

mod error;
mod include;
mod vars;

use std::collections::HashMap;
use std::path::Path;

pub use error::{TemplateError, EXIT_GENERIC, EXIT_IO, EXIT_MISSING_INCLUDE};
pub use include::{process_file, process_includes, MAX_INCLUDE_DEPTH};
pub use vars::{
    extract_variable_names, has_unsubstituted, substitute, substitute_with_sink, validate,
    SpecialVars, ValidationReport, SPECIAL_VARS,
};

/// Run both passes over a template file: expand includes, then substitute
/// variables.  Include failures abort with a typed error; unknown variables
/// only warn and stay literal.
pub fn process_template(
    path: &Path,
    variables: &HashMap<String, String>,
    specials: &SpecialVars,
) -> Result<String, TemplateError> {
    let expanded = process_file(path)?;
    Ok(substitute(&expanded, variables, specials))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_run_before_variables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part.md"), "from {{who}}").unwrap();
        std::fs::write(dir.path().join("top.md"), "say: @part.md").unwrap();
        let vars = HashMap::from([("who".to_string(), "ralph".to_string())]);
        let specials = SpecialVars::for_active_project(".ralph", "default");
        let out = process_template(&dir.path().join("top.md"), &vars, &specials).unwrap();
        assert_eq!(out, "say: from ralph");
    }

    #[test]
    fn missing_include_propagates_exit_code_2() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("top.md"), "@gone.md").unwrap();
        let specials = SpecialVars::for_active_project(".ralph", "default");
        let err =
            process_template(&dir.path().join("top.md"), &HashMap::new(), &specials).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_MISSING_INCLUDE);
    }
}
