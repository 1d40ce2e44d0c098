// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compression run reporting: machine-readable JSON artifact keyed by
//! run id, plus a human summary.

use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Aggregated counters for one compression run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressionReport {
    pub run_id: String,
    pub started_at: u64,
    pub finished_at: u64,
    pub memories_scanned: usize,
    pub clusters_found: usize,
    pub clusters_skipped: usize,
    pub clusters_refused: usize,
    pub clusters_compressed: usize,
    pub members_archived: usize,
    pub atoms_created: usize,
    pub atoms_deduped: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub errors: Vec<String>,
}

impl CompressionReport {
    pub fn new(run_id: impl Into<String>, started_at: u64) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
            ..Self::default()
        }
    }

    /// Overall token ratio achieved across the run.
    pub fn overall_ratio(&self) -> Option<f64> {
        if self.tokens_after == 0 {
            return None;
        }
        Some(self.tokens_before as f64 / self.tokens_after as f64)
    }

    pub fn record_error(&mut self, error: impl std::fmt::Display) {
        self.errors.push(error.to_string());
    }

    /// Write the JSON artifact under the reports directory.
    pub fn write_artifact(&self, reports_dir: &Path) -> Result<PathBuf, CompressError> {
        std::fs::create_dir_all(reports_dir)?;
        let path = reports_dir.join(format!("compression-{}.json", self.run_id));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CompressError::BadJson(e.to_string()))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Human summary for logs and bus messages.
    pub fn render_human(&self) -> String {
        let ratio = self
            .overall_ratio()
            .map(|r| format!("{r:.1}x"))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "compression run {}: scanned {}, clusters {} (skipped {}, refused {}), \
             compressed {} ({} members archived), atoms +{} (deduped {}), \
             tokens {} -> {} ({ratio}), errors {}",
            self.run_id,
            self.memories_scanned,
            self.clusters_found,
            self.clusters_skipped,
            self.clusters_refused,
            self.clusters_compressed,
            self.members_archived,
            self.atoms_created,
            self.atoms_deduped,
            self.tokens_before,
            self.tokens_after,
            self.errors.len(),
        )
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
