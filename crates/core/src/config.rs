// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration for the supervisory plane.
//!
//! Loaded once at daemon start from a TOML file; every option has a
//! default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// What the SOP patcher does when a tier-3 preview expires unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier3TimeoutAction {
    /// Drop the patch; the failure row stays `escalated`.
    Skip,
    /// Commit the already-appended entry.
    Commit,
}

/// Self-healing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealingConfig {
    pub enabled: bool,
    /// Runbooks the operator allows to auto-execute after graduation.
    pub auto_execute_whitelist: Vec<String>,
    /// Confidence at or above which tier 0 (silent) applies.
    pub confidence_auto_execute: f64,
    /// Dry runs required before a runbook may graduate.
    pub dry_run_graduation_count: u32,
    /// Wall-clock wait before post-execution verification.
    pub verification_interval_ms: u64,
    /// Clear readings required before an anomaly counts as gone.
    pub min_clear_readings: u32,
    /// Default dismiss window for operator dismissals.
    pub incident_dismiss_window_ms: u64,
    /// Terminal incidents older than this are purged at boot.
    pub incident_retention_ms: u64,
    /// Per-probe poll intervals, keyed by source id.
    pub probe_poll_interval_ms: BTreeMap<String, u64>,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_execute_whitelist: Vec::new(),
            confidence_auto_execute: 0.8,
            dry_run_graduation_count: 3,
            verification_interval_ms: 5_000,
            min_clear_readings: 1,
            incident_dismiss_window_ms: 86_400_000,
            incident_retention_ms: 7 * 86_400_000,
            probe_poll_interval_ms: BTreeMap::new(),
        }
    }
}

/// Real-time learning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Phrases that mark a user message as a correction.
    pub correction_keywords: Vec<String>,
    /// A correction binds to a tool call at most this far back.
    pub correction_scan_window_ms: u64,
    /// Window for the recurrence query.
    pub recurrence_window_days: u32,
    /// Tier-3 preview lifetime.
    pub preview_ttl_minutes: u64,
    pub tier3_default_on_timeout: Tier3TimeoutAction,
    /// Directory SOP patches are confined to.
    pub sop_directory: PathBuf,
    /// Bound of the detection queue.
    pub queue_capacity: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            correction_keywords: [
                "wrong",
                "wrong path",
                "should be",
                "that's not",
                "incorrect",
                "actually",
                "not what i asked",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            correction_scan_window_ms: 120_000,
            recurrence_window_days: 14,
            preview_ttl_minutes: 60,
            tier3_default_on_timeout: Tier3TimeoutAction::Skip,
            sop_directory: PathBuf::from("sop"),
            queue_capacity: 256,
        }
    }
}

/// Knowledge compression options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub cluster_min_members: usize,
    pub cluster_similarity_threshold: f64,
    /// Distillations below this ratio are refused.
    pub min_compression_ratio: f64,
    pub atom_dedup_similarity: f64,
    /// Memories younger than this are never compressed.
    pub stm_min_age_ms: u64,
    /// Token bound per cluster.
    pub max_cluster_tokens: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            cluster_min_members: 3,
            cluster_similarity_threshold: 0.55,
            min_compression_ratio: 1.5,
            atom_dedup_similarity: 0.85,
            stm_min_age_ms: 6 * 3_600_000,
            max_cluster_tokens: 4_000,
        }
    }
}

/// Session continuity options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub lookback_days: u32,
    pub relevance_threshold: f64,
    pub max_sessions_scored: usize,
    pub max_inherited_pins: usize,
    /// Floor of the read-time confidence decay factor.
    pub decay_min_floor: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            relevance_threshold: 0.3,
            max_sessions_scored: 10,
            max_inherited_pins: 5,
            decay_min_floor: 0.4,
        }
    }
}

/// Shared cortex (model routing) options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CortexConfig {
    pub default_model: String,
    /// Ordered fallback chain tried after the selected model.
    pub fallback_models: Vec<String>,
    /// Per-task model policy, keyed by task kind.
    pub task_policies: BTreeMap<String, String>,
    /// Attempts across the whole chain.
    pub attempt_budget: u32,
    pub request_timeout_ms: u64,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            default_model: "haiku".to_string(),
            fallback_models: vec!["sonnet".to_string()],
            task_policies: BTreeMap::new(),
            attempt_budget: 3,
            request_timeout_ms: 30_000,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedullaConfig {
    pub healing: HealingConfig,
    pub learning: LearningConfig,
    pub compression: CompressionConfig,
    pub session: SessionConfig,
    pub cortex: CortexConfig,
}

impl MedullaConfig {
    /// Parse a TOML document; missing sections fall back to defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a file; a missing file yields the defaults.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Poll interval for a probe, with a per-source override.
    pub fn probe_interval_ms(&self, source_id: &str, fallback_ms: u64) -> u64 {
        self.healing
            .probe_poll_interval_ms
            .get(source_id)
            .copied()
            .unwrap_or(fallback_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
