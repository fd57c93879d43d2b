// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Recursive `@file` include expansion.
//!
//! An include is `@` followed by a path, optionally wrapped in single or
//! double quotes (the quotes must pair; the path itself is free-form inside
//! them).  Relative paths resolve against the directory of the file being
//! processed, so nested includes compose no matter where the top-level
//! template lives.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::TemplateError;

/// Maximum include nesting before expansion fails with `MaxDepthExceeded`.
pub const MAX_INCLUDE_DEPTH: usize = 10;

fn include_pattern() -> Regex {
    // Three alternatives: double-quoted, single-quoted, bare token.
    // The bare form stops at whitespace, quotes and punctuation that is not
    // path-like; notably `:` ends it, so the legacy `@file:path` spelling is
    // not consumed as a whole.
    Regex::new(r#"@(?:"([^"\n]+)"|'([^'\n]+)'|([A-Za-z0-9_./~-]+))"#)
        .expect("include pattern is valid")
}

/// Expand all `@file` includes in a template file.
pub fn process_file(path: &Path) -> Result<String, TemplateError> {
    let resolved = canonical(path)?;
    let content = read(&resolved)?;
    let base = resolved
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    expand(&content, &base, &[resolved])
}

/// Expand all `@file` includes in an in-memory template, resolving relative
/// paths against `base_dir`.
pub fn process_includes(content: &str, base_dir: &Path) -> Result<String, TemplateError> {
    expand(content, base_dir, &[])
}

fn expand(content: &str, base_dir: &Path, stack: &[PathBuf]) -> Result<String, TemplateError> {
    let pattern = include_pattern();
    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for caps in pattern.captures_iter(content) {
        let whole = caps.get(0).expect("match group 0");
        let token = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .expect("one path alternative matched")
            .as_str();

        out.push_str(&content[last..whole.start()]);
        last = whole.end();

        let target = if Path::new(token).is_absolute() {
            PathBuf::from(token)
        } else {
            base_dir.join(token)
        };
        if !target.is_file() {
            return Err(TemplateError::FileNotFound {
                path: target,
                from: stack
                    .last()
                    .cloned()
                    .unwrap_or_else(|| base_dir.to_path_buf()),
            });
        }
        let resolved = canonical(&target)?;

        if stack.contains(&resolved) {
            return Err(TemplateError::Cycle {
                chain: chain_string(stack, &resolved),
            });
        }
        if stack.len() >= MAX_INCLUDE_DEPTH {
            return Err(TemplateError::MaxDepthExceeded {
                max: MAX_INCLUDE_DEPTH,
                chain: chain_string(stack, &resolved),
            });
        }

        let included = read(&resolved)?;
        // Each branch gets its own snapshot of the stack: two siblings may
        // include the same leaf, only a true cycle errors.
        let mut branch = stack.to_vec();
        branch.push(resolved.clone());
        let next_base = resolved
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let expanded = expand(&included, &next_base, &branch)?;
        out.push_str(&expanded);
    }

    out.push_str(&content[last..]);
    Ok(out)
}

fn canonical(path: &Path) -> Result<PathBuf, TemplateError> {
    path.canonicalize().map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String, TemplateError> {
    std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn chain_string(stack: &[PathBuf], next: &Path) -> String {
    let mut parts: Vec<String> = stack.iter().map(|p| p.display().to_string()).collect();
    parts.push(next.display().to_string());
    parts.join(" -> ")
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn plain_text_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let out = process_includes("no includes here", dir.path()).unwrap();
        assert_eq!(out, "no includes here");
    }

    #[test]
    fn bare_include_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "part.md", "PART");
        let out = process_includes("before @part.md after", dir.path()).unwrap();
        assert_eq!(out, "before PART after");
    }

    #[test]
    fn quoted_include_allows_spaces() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "my part.md", "SPACED");
        let out = process_includes(r#"x @"my part.md" y"#, dir.path()).unwrap();
        assert_eq!(out, "x SPACED y");
        let out = process_includes("x @'my part.md' y", dir.path()).unwrap();
        assert_eq!(out, "x SPACED y");
    }

    #[test]
    fn nested_includes_resolve_against_their_own_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        write(&sub, "leaf.md", "LEAF");
        // inner.md lives in sub/ and refers to leaf.md relative to itself
        write(&sub, "inner.md", "(@leaf.md)");
        write(dir.path(), "top.md", "top @sub/inner.md end");
        let out = process_file(&dir.path().join("top.md")).unwrap();
        assert_eq!(out, "top (LEAF) end");
    }

    #[test]
    fn missing_include_names_path_and_including_file() {
        let dir = tempfile::tempdir().unwrap();
        let top = write(dir.path(), "a.md", "@missing.md");
        let err = process_file(&top).unwrap_err();
        match &err {
            TemplateError::FileNotFound { path, from } => {
                assert!(path.ends_with("missing.md"));
                assert!(from.ends_with("a.md"));
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
        assert_eq!(err.exit_code(), crate::error::EXIT_MISSING_INCLUDE);
    }

    #[test]
    fn two_file_cycle_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "A @b.md");
        write(dir.path(), "b.md", "B @a.md");
        let err = process_file(&dir.path().join("a.md")).unwrap_err();
        match &err {
            TemplateError::Cycle { chain } => assert!(chain.contains("a.md")),
            other => panic!("expected Cycle, got {other:?}"),
        }
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn self_include_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "@a.md");
        let err = process_file(&dir.path().join("a.md")).unwrap_err();
        assert!(matches!(err, TemplateError::Cycle { .. }));
    }

    #[test]
    fn siblings_may_share_a_leaf() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "leaf.md", "L");
        write(dir.path(), "x.md", "@leaf.md");
        write(dir.path(), "y.md", "@leaf.md");
        write(dir.path(), "top.md", "@x.md @y.md @leaf.md");
        let out = process_file(&dir.path().join("top.md")).unwrap();
        assert_eq!(out, "L L L");
    }

    #[test]
    fn linear_chain_of_ten_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "f10.md", "END");
        for i in (1..10).rev() {
            write(dir.path(), &format!("f{i}.md"), &format!("@f{}.md", i + 1));
        }
        let out = process_file(&dir.path().join("f1.md")).unwrap();
        assert_eq!(out, "END");
    }

    #[test]
    fn linear_chain_of_eleven_exceeds_depth() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "f11.md", "END");
        for i in (1..11).rev() {
            write(dir.path(), &format!("f{i}.md"), &format!("@f{}.md", i + 1));
        }
        let err = process_file(&dir.path().join("f1.md")).unwrap_err();
        match &err {
            TemplateError::MaxDepthExceeded { max, chain } => {
                assert_eq!(*max, MAX_INCLUDE_DEPTH);
                assert!(chain.contains("f11.md"));
            }
            other => panic!("expected MaxDepthExceeded, got {other:?}"),
        }
    }

    #[test]
    fn error_returns_no_partial_expansion() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.md", "GOOD");
        write(dir.path(), "top.md", "@good.md then @missing.md");
        // The failure discards everything, including the part that expanded.
        assert!(process_file(&dir.path().join("top.md")).is_err());
    }

    #[test]
    fn colon_spelling_is_not_an_include_of_the_full_token() {
        let dir = tempfile::tempdir().unwrap();
        // `@file:path` — the bare token stops at `:`; only `file` is tried.
        write(dir.path(), "file", "F");
        let out = process_includes("@file:rest", dir.path()).unwrap();
        assert_eq!(out, "F:rest");
    }

    #[test]
    fn email_like_text_fails_as_missing_include() {
        // An `@` adjacent to a path-like token is treated as an include; the
        // engine does not guess intent.  Missing targets surface as errors.
        let dir = tempfile::tempdir().unwrap();
        let err = process_includes("mail me at user@example.com", dir.path()).unwrap_err();
        assert!(matches!(err, TemplateError::FileNotFound { .. }));
    }
}
