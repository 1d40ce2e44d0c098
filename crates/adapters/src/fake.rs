// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for tests.

use crate::cortex::{CortexAdapter, CortexError, CortexRequest, CortexResponse};
use crate::probe::{DataSourceAdapter, MockSlot};
use async_trait::async_trait;
use medulla_core::{Clock, FakeClock, Reading};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Probe that only ever serves mock data.
pub struct FakeProbe {
    source_id: String,
    poll_interval_ms: u64,
    mock: MockSlot,
    clock: FakeClock,
    polls: Mutex<u32>,
}

impl FakeProbe {
    pub fn new(source_id: &str, poll_interval_ms: u64) -> Self {
        Self {
            source_id: source_id.to_string(),
            poll_interval_ms,
            mock: MockSlot::new(),
            clock: FakeClock::new(),
            polls: Mutex::new(0),
        }
    }

    pub fn clock(&self) -> &FakeClock {
        &self.clock
    }

    /// Number of polls since construction or `reset()`.
    pub fn poll_count(&self) -> u32 {
        *self.polls.lock()
    }
}

#[async_trait]
impl DataSourceAdapter for FakeProbe {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    async fn poll(&self) -> Reading {
        *self.polls.lock() += 1;
        let now = self.clock.epoch_ms();
        match self.mock.get() {
            Some(data) => Reading::available(&self.source_id, now, data),
            None => Reading::unavailable(&self.source_id, now, "no mock data installed"),
        }
    }

    fn set_mock_data(&self, data: serde_json::Value) {
        self.mock.set(data);
    }

    fn clear_mock(&self) {
        self.mock.clear();
    }

    fn reset(&self) {
        *self.polls.lock() = 0;
    }
}

/// Scripted completion results, served in order.
#[derive(Clone, Default)]
pub struct FakeCortexAdapter {
    script: Arc<Mutex<VecDeque<Result<String, CortexError>>>>,
    requests: Arc<Mutex<Vec<CortexRequest>>>,
}

impl FakeCortexAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn push_text(&self, text: &str) {
        self.script.lock().push_back(Ok(text.to_string()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: CortexError) {
        self.script.lock().push_back(Err(error));
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<CortexRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CortexAdapter for FakeCortexAdapter {
    async fn complete(&self, request: &CortexRequest) -> Result<CortexResponse, CortexError> {
        self.requests.lock().push(request.clone());
        match self.script.lock().pop_front() {
            Some(Ok(text)) => Ok(CortexResponse {
                tokens_in: request.prompt.split_whitespace().count() as u64,
                tokens_out: text.split_whitespace().count() as u64,
                model: request.model.clone(),
                text,
            }),
            Some(Err(error)) => Err(error),
            None => Err(CortexError::Transport("fake script exhausted".into())),
        }
    }
}
