// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout of the daemon's state directory.

use std::path::PathBuf;

/// All paths the daemon touches, rooted in one state directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    /// Main relational store.
    pub db_path: PathBuf,
    /// Parallel append-only metrics store.
    pub metrics_path: PathBuf,
    /// Lock/PID file.
    pub lock_path: PathBuf,
    /// Daemon log file.
    pub log_path: PathBuf,
    /// TOML configuration.
    pub config_path: PathBuf,
    /// SOP markdown files (patch target).
    pub sop_dir: PathBuf,
    /// Session snapshot JSON documents.
    pub sessions_dir: PathBuf,
    /// Compression report artifacts.
    pub reports_dir: PathBuf,
    /// Root under which regression stubs are generated.
    pub regression_root: PathBuf,
}

impl Paths {
    /// Layout under an explicit root (tests, containers).
    pub fn under(state_dir: PathBuf) -> Self {
        Self {
            db_path: state_dir.join("medulla.db"),
            metrics_path: state_dir.join("metrics.db"),
            lock_path: state_dir.join("medullad.pid"),
            log_path: state_dir.join("medullad.log"),
            config_path: state_dir.join("medulla.toml"),
            sop_dir: state_dir.join("sop"),
            sessions_dir: state_dir.join("sessions"),
            reports_dir: state_dir.join("reports"),
            regression_root: state_dir.join("regressions"),
            state_dir,
        }
    }

    /// Default user-level layout: `$XDG_STATE_HOME/medulla` or
    /// `~/.local/state/medulla`.
    pub fn default_user() -> Option<Self> {
        let state_dir = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("state")))?
            .join("medulla");
        Some(Self::under(state_dir))
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
