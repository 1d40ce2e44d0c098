// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SOP file patcher.
//!
//! Writes are confined to the configured SOP directory. Tier ≤ 2 entries
//! are appended and auto-committed (commit failure is non-fatal and
//! recorded); tier 3 entries are appended but never committed, and the
//! caller posts the diff for operator approval instead.

use crate::error::LearnError;
use chrono::{TimeZone, Utc};
use medulla_adapters::subprocess::{run_argv, run_argv_stdout, VCS_COMMAND_TIMEOUT};
use medulla_core::{validate_relative_path, Clock, FailureEvent, ShortId, Tier};
use std::path::{Path, PathBuf};

/// Root-cause to SOP file routing. Falls back to `corrections.md`.
const ROOT_CAUSE_FILES: &[(&str, &str)] = &[
    ("bad_path", "path-handling.md"),
    ("missing_permission", "permissions.md"),
    ("slow_dependency", "timeouts.md"),
    ("sop_violation", "sop-compliance.md"),
    ("trust_regression", "trust-boundaries.md"),
    ("pipeline_failure", "pipelines.md"),
];

const FALLBACK_FILE: &str = "corrections.md";

/// Outcome of one patch application.
#[derive(Debug, Clone)]
pub struct SopApply {
    pub target_file: PathBuf,
    /// Entry appended this call (false when the idlock marker was
    /// already present).
    pub appended: bool,
    pub committed: bool,
    pub commit_sha: Option<String>,
    /// The appended entry, for tier-3 previews.
    pub diff_preview: String,
    /// Commit failure detail, when the commit was attempted and failed.
    pub commit_error: Option<String>,
}

/// Appends structured lesson entries to SOP markdown files.
pub struct SopPatcher<C: Clock> {
    sop_dir: PathBuf,
    clock: C,
}

impl<C: Clock> SopPatcher<C> {
    pub fn new(sop_dir: PathBuf, clock: C) -> Self {
        Self { sop_dir, clock }
    }

    pub fn sop_dir(&self) -> &Path {
        &self.sop_dir
    }

    /// Resolve the target file: a valid relative `context.sop_file`
    /// wins, else the root-cause table, else the fallback.
    pub fn resolve_target(&self, failure: &FailureEvent) -> PathBuf {
        if let Some(candidate) = failure.context.get("sop_file").and_then(|v| v.as_str()) {
            match validate_relative_path(&self.sop_dir, candidate) {
                Ok(path) => return path,
                Err(e) => {
                    tracing::warn!(candidate, error = %e, "context sop_file rejected");
                }
            }
        }
        let file = ROOT_CAUSE_FILES
            .iter()
            .find(|(cause, _)| *cause == failure.root_cause)
            .map(|(_, file)| *file)
            .unwrap_or(FALLBACK_FILE);
        self.sop_dir.join(file)
    }

    /// Append the lesson entry and, for tier ≤ 2, attempt a VCS commit.
    pub async fn apply(&self, failure: &FailureEvent) -> Result<SopApply, LearnError> {
        let target = self.resolve_target(failure);
        std::fs::create_dir_all(&self.sop_dir)?;

        let marker = format!("<!-- rtl:{} -->", failure.id);
        let existing = std::fs::read_to_string(&target).unwrap_or_default();
        if existing.contains(&marker) {
            tracing::debug!(file = %target.display(), failure = %failure.id, "entry already present");
            return Ok(SopApply {
                target_file: target,
                appended: false,
                committed: false,
                commit_sha: None,
                diff_preview: String::new(),
                commit_error: None,
            });
        }

        let entry = self.render_entry(failure, &marker);
        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&entry);
        std::fs::write(&target, &content)?;
        tracing::info!(file = %target.display(), failure = %failure.id, "sop entry appended");

        let diff_preview = format!("--- {}\n{}", target.display(), entry);

        if failure.tier >= Tier::T3 {
            return Ok(SopApply {
                target_file: target,
                appended: true,
                committed: false,
                commit_sha: None,
                diff_preview,
                commit_error: None,
            });
        }

        let (committed, commit_sha, commit_error) = self.commit(&target, failure).await;
        Ok(SopApply {
            target_file: target,
            appended: true,
            committed,
            commit_sha,
            diff_preview,
            commit_error,
        })
    }

    fn render_entry(&self, failure: &FailureEvent, marker: &str) -> String {
        let date = Utc
            .timestamp_millis_opt(self.clock.epoch_ms() as i64)
            .single()
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown-date".to_string());
        format!(
            "\n## {date} {} ({}) {marker}\n\n\
             - Failure: {}\n\
             - Source: {}\n\
             - Root cause: {}\n",
            failure.root_cause,
            failure.failure_type,
            failure.failure_desc,
            failure.source,
            failure.root_cause,
        )
    }

    /// Best-effort git add + commit. Never fatal.
    async fn commit(
        &self,
        target: &Path,
        failure: &FailureEvent,
    ) -> (bool, Option<String>, Option<String>) {
        let dir = self.sop_dir.to_string_lossy().into_owned();
        let file = target.to_string_lossy().into_owned();
        let message = format!(
            "sop: record {} from {} [{}]",
            failure.root_cause,
            failure.failure_type,
            failure.id.short(8)
        );

        let add = vec!["git".to_string(), "-C".to_string(), dir.clone(), "add".to_string(), file];
        if let Err(e) = run_argv_stdout(&add, VCS_COMMAND_TIMEOUT, "git add").await {
            tracing::warn!(error = %e, "sop auto-commit failed at add");
            return (false, None, Some(e));
        }

        let commit = vec![
            "git".to_string(),
            "-C".to_string(),
            dir.clone(),
            "commit".to_string(),
            "-m".to_string(),
            message,
        ];
        if let Err(e) = run_argv(&commit, None, VCS_COMMAND_TIMEOUT, "git commit")
            .await
            .and_then(|o| {
                if o.status.success() {
                    Ok(o)
                } else {
                    Err(String::from_utf8_lossy(&o.stderr).trim().to_string())
                }
            })
        {
            tracing::warn!(error = %e, "sop auto-commit failed at commit");
            return (false, None, Some(e));
        }

        let rev = vec![
            "git".to_string(),
            "-C".to_string(),
            dir,
            "rev-parse".to_string(),
            "HEAD".to_string(),
        ];
        let sha = run_argv_stdout(&rev, VCS_COMMAND_TIMEOUT, "git rev-parse")
            .await
            .ok();
        (true, sha, None)
    }
}

#[cfg(test)]
#[path = "sop_tests.rs"]
mod tests;
