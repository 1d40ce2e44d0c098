// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness probe backed by `pgrep`.

use crate::probe::{DataSourceAdapter, MockSlot};
use crate::subprocess::{run_argv, PROBE_COMMAND_TIMEOUT};
use async_trait::async_trait;
use medulla_core::{is_safe_token, Clock, Reading, SystemClock};
use serde_json::json;

/// Polls `pgrep -x <name>` and reports whether the process is running.
pub struct ProcessProbe<C: Clock = SystemClock> {
    source_id: String,
    process_name: String,
    poll_interval_ms: u64,
    mock: MockSlot,
    clock: C,
}

impl ProcessProbe<SystemClock> {
    /// Returns `None` when `process_name` fails the safe-token predicate;
    /// an unsafe name must never reach `pgrep`.
    pub fn new(process_name: &str, poll_interval_ms: u64) -> Option<Self> {
        Self::with_clock(process_name, poll_interval_ms, SystemClock)
    }
}

impl<C: Clock> ProcessProbe<C> {
    pub fn with_clock(process_name: &str, poll_interval_ms: u64, clock: C) -> Option<Self> {
        if !is_safe_token(process_name) {
            return None;
        }
        Some(Self {
            source_id: format!("probe-process:{process_name}"),
            process_name: process_name.to_string(),
            poll_interval_ms,
            mock: MockSlot::new(),
            clock,
        })
    }
}

#[async_trait]
impl<C: Clock + 'static> DataSourceAdapter for ProcessProbe<C> {
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

        let argv = vec![
            "pgrep".to_string(),
            "-x".to_string(),
            self.process_name.clone(),
        ];
        match run_argv(&argv, None, PROBE_COMMAND_TIMEOUT, "pgrep").await {
            Ok(output) => {
                // pgrep exits 1 for "no processes matched"; that is a valid
                // reading, not a probe failure.
                let stdout = String::from_utf8_lossy(&output.stdout);
                let pids: Vec<i64> = stdout
                    .lines()
                    .filter_map(|line| line.trim().parse().ok())
                    .collect();
                Reading::available(
                    &self.source_id,
                    now,
                    json!({
                        "name": self.process_name,
                        "pid_found": !pids.is_empty(),
                        "pids": pids,
                    }),
                )
            }
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
#[path = "process_tests.rs"]
mod tests;
