// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Probe framework: uniform polled-source contract.

use async_trait::async_trait;
use medulla_core::Reading;
use parking_lot::Mutex;
use std::sync::Arc;

/// A polled data source.
///
/// Probes never error: an unpollable source yields
/// `Reading { available: false, error }`. Probes are stateless apart from
/// bounded counters, which `reset()` clears for test isolation.
#[async_trait]
pub trait DataSourceAdapter: Send + Sync + 'static {
    fn source_id(&self) -> &str;

    fn poll_interval_ms(&self) -> u64;

    /// Readings older than this are stale. Convention: 2x the interval.
    fn freshness_threshold_ms(&self) -> u64 {
        self.poll_interval_ms() * 2
    }

    async fn poll(&self) -> Reading;

    /// Install mock data; subsequent polls return it without touching the
    /// real source. Part of the probe contract.
    fn set_mock_data(&self, data: serde_json::Value);

    /// Remove installed mock data.
    fn clear_mock(&self);

    /// Clear bounded internal counters.
    fn reset(&self) {}
}

/// Shared mock-data slot used by every concrete probe.
#[derive(Clone, Default)]
pub struct MockSlot {
    data: Arc<Mutex<Option<serde_json::Value>>>,
}

impl MockSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, data: serde_json::Value) {
        *self.data.lock() = Some(data);
    }

    pub fn clear(&self) {
        *self.data.lock() = None;
    }

    /// Current mock payload, if installed.
    pub fn get(&self) -> Option<serde_json::Value> {
        self.data.lock().clone()
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
