// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Regression-test stub generator.
//!
//! Creates a persisted row plus a file stub at the conventional
//! location; authors replace the placeholder assertion.

use crate::error::LearnError;
use medulla_core::{Clock, FailureEvent, ShortId};
use medulla_storage::{FailureRepo, RegressionTestRow};
use std::path::{Path, PathBuf};

/// Writes regression stubs under `<root>/tests/regressions/`.
pub struct RegressionGenerator<C: Clock> {
    root: PathBuf,
    repo: FailureRepo,
    clock: C,
}

impl<C: Clock> RegressionGenerator<C> {
    pub fn new(root: PathBuf, repo: FailureRepo, clock: C) -> Self {
        Self { root, repo, clock }
    }

    fn stub_dir(&self) -> PathBuf {
        self.root.join("tests").join("regressions")
    }

    fn fn_name(failure: &FailureEvent) -> String {
        let slug: String = failure
            .root_cause
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("regression_{}_{}", slug, failure.id.short(8).replace('-', "_"))
    }

    /// Generate the stub. Returns the created row.
    pub fn generate(&self, failure: &FailureEvent) -> Result<RegressionTestRow, LearnError> {
        let dir = self.stub_dir();
        std::fs::create_dir_all(&dir)?;

        let file_name = format!("{}.rs", Self::fn_name(failure));
        let path = dir.join(&file_name);
        std::fs::write(&path, Self::render(failure))?;

        let row = RegressionTestRow {
            id: format!("rt-{}", failure.id),
            failure_id: failure.id.clone(),
            file_path: path.to_string_lossy().into_owned(),
            created_at: self.clock.epoch_ms(),
        };
        self.repo.insert_regression_test(&row)?;
        tracing::info!(failure = %failure.id, file = %path.display(), "regression stub written");
        Ok(row)
    }

    fn render(failure: &FailureEvent) -> String {
        let desc = failure.failure_desc.escape_default().to_string();
        let name = Self::fn_name(failure);
        format!(
            "// Regression stub generated from failure {id}.\n\
             // Replace the placeholder assertion with a real reproduction.\n\
             \n\
             #[test]\n\
             #[ignore = \"stub awaiting a real reproduction\"]\n\
             fn {name}() {{\n\
            \x20    // Observed failure: {desc}\n\
            \x20    assert!(false, \"placeholder: reproduce and assert the fix\");\n\
             }}\n",
            id = failure.id,
        )
    }

    pub fn stub_root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
#[path = "regression_tests.rs"]
mod tests;
