// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disk usage probe backed by `df -P`.

use crate::probe::{DataSourceAdapter, MockSlot};
use crate::subprocess::{run_argv_stdout, PROBE_COMMAND_TIMEOUT};
use async_trait::async_trait;
use medulla_core::{Clock, Reading, SystemClock};
use serde_json::json;

/// Polls POSIX `df` output for one mount point.
pub struct DiskProbe<C: Clock = SystemClock> {
    source_id: String,
    mount: String,
    poll_interval_ms: u64,
    mock: MockSlot,
    clock: C,
}

impl DiskProbe<SystemClock> {
    pub fn new(mount: &str, poll_interval_ms: u64) -> Self {
        Self::with_clock(mount, poll_interval_ms, SystemClock)
    }
}

impl<C: Clock> DiskProbe<C> {
    pub fn with_clock(mount: &str, poll_interval_ms: u64, clock: C) -> Self {
        Self {
            source_id: format!("probe-disk:{mount}"),
            mount: mount.to_string(),
            poll_interval_ms,
            mock: MockSlot::new(),
            clock,
        }
    }

    /// Parse the use% column out of `df -P` output.
    fn parse_used_pct(output: &str) -> Option<f64> {
        let line = output.lines().nth(1)?;
        let field = line.split_whitespace().nth(4)?;
        field.trim_end_matches('%').parse().ok()
    }
}

#[async_trait]
impl<C: Clock + 'static> DataSourceAdapter for DiskProbe<C> {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    async fn poll(&self) -> Reading {
        let now = self.clock.epoch_ms();
        if let Some(data) = self.mock.get() {
            return Reading::available(&self.source_id, now, data);
        }

        let argv = vec!["df".to_string(), "-P".to_string(), self.mount.clone()];
        match run_argv_stdout(&argv, PROBE_COMMAND_TIMEOUT, "df").await {
            Ok(stdout) => match Self::parse_used_pct(&stdout) {
                Some(used_pct) => Reading::available(
                    &self.source_id,
                    now,
                    json!({"mount": self.mount, "used_pct": used_pct}),
                ),
                None => Reading::unavailable(
                    &self.source_id,
                    now,
                    format!("unparseable df output for {}", self.mount),
                ),
            },
            Err(e) => Reading::unavailable(&self.source_id, now, e),
        }
    }

    fn set_mock_data(&self, data: serde_json::Value) {
        self.mock.set(data);
    }

    fn clear_mock(&self) {
        self.mock.clear();
    }
}

#[cfg(test)]
#[path = "disk_tests.rs"]
mod tests;
