// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted per-runbook execution metadata and dry-run graduation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution mode of a runbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunbookMode {
    /// Describe steps without performing them.
    DryRun,
    /// Perform steps for real.
    AutoExecute,
}

impl RunbookMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunbookMode::DryRun => "dry_run",
            RunbookMode::AutoExecute => "auto_execute",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dry_run" => Some(RunbookMode::DryRun),
            "auto_execute" => Some(RunbookMode::AutoExecute),
            _ => None,
        }
    }
}

impl fmt::Display for RunbookMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted counters for one runbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunbookMeta {
    pub runbook_id: String,
    pub dry_run_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_succeeded_at: Option<u64>,
    /// Confidence in `[0, 1]`, adjusted by outcomes.
    pub confidence: f64,
    pub mode: RunbookMode,
}

impl RunbookMeta {
    /// Fresh metadata for a never-executed runbook.
    pub fn fresh(runbook_id: impl Into<String>) -> Self {
        Self {
            runbook_id: runbook_id.into(),
            dry_run_count: 0,
            last_executed_at: None,
            last_succeeded_at: None,
            confidence: 0.5,
            mode: RunbookMode::DryRun,
        }
    }

    /// Whether this runbook may graduate to auto-execute.
    ///
    /// Both conditions are required: enough rehearsals AND an explicit
    /// operator whitelist entry.
    pub fn graduation_eligible(&self, graduation_count: u32, whitelist: &[String]) -> bool {
        self.dry_run_count >= graduation_count
            && whitelist.iter().any(|id| id == &self.runbook_id)
    }
}

#[cfg(test)]
#[path = "runbook_meta_tests.rs"]
mod tests;
