// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System memory probe backed by `/proc/meminfo`.

use crate::probe::{DataSourceAdapter, MockSlot};
use async_trait::async_trait;
use medulla_core::{Clock, Reading, SystemClock};
use serde_json::json;
use std::path::PathBuf;

/// Reports memory usage of the host.
///
/// Target id for anomalies is always `system-memory`.
pub struct MemoryProbe<C: Clock = SystemClock> {
    poll_interval_ms: u64,
    meminfo_path: PathBuf,
    mock: MockSlot,
    clock: C,
}

impl MemoryProbe<SystemClock> {
    pub fn new(poll_interval_ms: u64) -> Self {
        Self::with_clock(poll_interval_ms, SystemClock)
    }
}

impl<C: Clock> MemoryProbe<C> {
    pub fn with_clock(poll_interval_ms: u64, clock: C) -> Self {
        Self {
            poll_interval_ms,
            meminfo_path: PathBuf::from("/proc/meminfo"),
            mock: MockSlot::new(),
            clock,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_meminfo_path(mut self, path: PathBuf) -> Self {
        self.meminfo_path = path;
        self
    }

    fn parse_meminfo(text: &str) -> Option<(u64, u64)> {
        let mut total_kb = None;
        let mut available_kb = None;
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("MemTotal:") => total_kb = parts.next()?.parse().ok(),
                Some("MemAvailable:") => available_kb = parts.next()?.parse().ok(),
                _ => {}
            }
        }
        Some((total_kb?, available_kb?))
    }
}

#[async_trait]
impl<C: Clock + 'static> DataSourceAdapter for MemoryProbe<C> {
    fn source_id(&self) -> &str {
        "probe-memory"
    }

    fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    async fn poll(&self) -> Reading {
        let now = self.clock.epoch_ms();
        if let Some(data) = self.mock.get() {
            return Reading::available("probe-memory", now, data);
        }

        match tokio::fs::read_to_string(&self.meminfo_path).await {
            Ok(text) => match Self::parse_meminfo(&text) {
                Some((total_kb, available_kb)) => {
                    let used_pct = if total_kb == 0 {
                        0.0
                    } else {
                        100.0 * (total_kb - available_kb) as f64 / total_kb as f64
                    };
                    Reading::available(
                        "probe-memory",
                        now,
                        json!({
                            "target": "system-memory",
                            "total_kb": total_kb,
                            "available_kb": available_kb,
                            "used_pct": used_pct,
                        }),
                    )
                }
                None => Reading::unavailable("probe-memory", now, "unparseable meminfo"),
            },
            Err(e) => Reading::unavailable("probe-memory", now, format!("meminfo read: {e}")),
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
#[path = "memory_tests.rs"]
mod tests;
