// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Untrusted-input predicates for shell arguments and filesystem paths.
//!
//! Every field that reaches an external invocation must pass
//! [`is_safe_token`] first; rejection happens before any process spawn.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Rejections raised at a validation boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("unsafe token: {0:?}")]
    UnsafeToken(String),
    #[error("path escapes its root: {0}")]
    PathEscape(String),
    #[error("path contains shell metacharacters: {0}")]
    UnsafePath(String),
    #[error("path points at the system store: {0}")]
    OwnStore(String),
}

/// Accept only alphanumerics, dash, dot, and underscore.
///
/// Empty strings are rejected; so is anything that could splice into a
/// command line (`;`, `$(`, backticks, whitespace, slashes).
pub fn is_safe_token(input: &str) -> bool {
    !input.is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Characters that terminate or splice a shell word.
const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r', '"', '\'', '\\', '*', '?', '~', ' ',
];

fn has_shell_metacharacters(s: &str) -> bool {
    s.chars().any(|c| SHELL_METACHARACTERS.contains(&c))
}

/// Resolve a relative path against `root`, rejecting absolute paths,
/// traversal components, and shell metacharacters.
pub fn validate_relative_path(root: &Path, candidate: &str) -> Result<PathBuf, SanitizeError> {
    if has_shell_metacharacters(candidate) {
        return Err(SanitizeError::UnsafePath(candidate.to_string()));
    }
    let path = Path::new(candidate);
    if path.is_absolute() {
        return Err(SanitizeError::PathEscape(candidate.to_string()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(SanitizeError::PathEscape(candidate.to_string())),
        }
    }
    Ok(root.join(path))
}

/// Validate an external database path for the cross-domain extractors.
///
/// The path may be absolute but must be metacharacter-free and must not
/// point at the system's own store.
pub fn validate_db_path(candidate: &str, own_store: &Path) -> Result<PathBuf, SanitizeError> {
    if has_shell_metacharacters(candidate) {
        return Err(SanitizeError::UnsafePath(candidate.to_string()));
    }
    let path = PathBuf::from(candidate);
    if path == own_store {
        return Err(SanitizeError::OwnStore(candidate.to_string()));
    }
    Ok(path)
}

/// Clamp an untrusted row limit into `1..=max`.
pub fn clamp_limit(requested: i64, max: i64) -> i64 {
    requested.clamp(1, max)
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
