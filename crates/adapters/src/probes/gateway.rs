// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External gateway health probe.
//!
//! Runs a configured list-form health command (for example the SMS
//! gateway's ping script). The only probe state is a bounded
//! consecutive-failure counter, surfaced in every reading and cleared by
//! `reset()`.

use crate::probe::{DataSourceAdapter, MockSlot};
use crate::subprocess::{run_argv, PROBE_COMMAND_TIMEOUT};
use async_trait::async_trait;
use medulla_core::{Clock, Reading, SystemClock};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};

/// Counter ceiling; readings never report more than this.
const MAX_CONSECUTIVE_FAILURES: u32 = 1_000;

pub struct GatewayProbe<C: Clock = SystemClock> {
    source_id: String,
    health_argv: Vec<String>,
    poll_interval_ms: u64,
    consecutive_failures: AtomicU32,
    mock: MockSlot,
    clock: C,
}

impl GatewayProbe<SystemClock> {
    pub fn new(gateway_name: &str, health_argv: Vec<String>, poll_interval_ms: u64) -> Self {
        Self::with_clock(gateway_name, health_argv, poll_interval_ms, SystemClock)
    }
}

impl<C: Clock> GatewayProbe<C> {
    pub fn with_clock(
        gateway_name: &str,
        health_argv: Vec<String>,
        poll_interval_ms: u64,
        clock: C,
    ) -> Self {
        Self {
            source_id: format!("probe-gateway:{gateway_name}"),
            health_argv,
            poll_interval_ms,
            consecutive_failures: AtomicU32::new(0),
            mock: MockSlot::new(),
            clock,
        }
    }

    fn bump_failures(&self) -> u32 {
        let previous = self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
        previous.saturating_add(1).min(MAX_CONSECUTIVE_FAILURES)
    }
}

#[async_trait]
impl<C: Clock + 'static> DataSourceAdapter for GatewayProbe<C> {
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

        let start = self.clock.now();
        match run_argv(&self.health_argv, None, PROBE_COMMAND_TIMEOUT, "gateway health").await {
            Ok(output) if output.status.success() => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                let latency_ms = start.elapsed().as_millis() as u64;
                Reading::available(
                    &self.source_id,
                    now,
                    json!({
                        "reachable": true,
                        "latency_ms": latency_ms,
                        "consecutive_failures": 0,
                    }),
                )
            }
            Ok(output) => {
                let failures = self.bump_failures();
                Reading::available(
                    &self.source_id,
                    now,
                    json!({
                        "reachable": false,
                        "exit_code": output.status.code().unwrap_or(-1),
                        "consecutive_failures": failures,
                    }),
                )
            }
            Err(e) => {
                let failures = self.bump_failures();
                Reading::available(
                    &self.source_id,
                    now,
                    json!({
                        "reachable": false,
                        "error": e,
                        "consecutive_failures": failures,
                    }),
                )
            }
        }
    }

    fn set_mock_data(&self, data: serde_json::Value) {
        self.mock.set(data);
    }

    fn clear_mock(&self) {
        self.mock.clear();
    }

    fn reset(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
