// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording channel for tests.

use crate::channel::{ChannelError, ExternalChannel};
use crate::message::SynapseMessage;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Records delivered messages; can be told to fail.
#[derive(Clone, Default)]
pub struct FakeChannel {
    delivered: Arc<Mutex<Vec<SynapseMessage>>>,
    fail: Arc<Mutex<bool>>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<SynapseMessage> {
        self.delivered.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl ExternalChannel for FakeChannel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn deliver(&self, message: &SynapseMessage) -> Result<(), ChannelError> {
        if *self.fail.lock() {
            return Err(ChannelError::DeliveryFailed("fake channel down".into()));
        }
        self.delivered.lock().push(message.clone());
        Ok(())
    }
}
