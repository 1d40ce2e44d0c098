// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External delivery channels.

use crate::message::SynapseMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from channel delivery.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// One external delivery surface (desktop notification, SMS gateway,
/// channel adapter).
#[async_trait]
pub trait ExternalChannel: Send + Sync + 'static {
    /// Channel name for logs and metrics tags.
    fn name(&self) -> &str;

    /// Deliver one message. Implementations carry their own timeouts.
    async fn deliver(&self, message: &SynapseMessage) -> Result<(), ChannelError>;
}

/// Channel that drops everything (headless deployments).
#[derive(Debug, Clone, Default)]
pub struct NoOpChannel;

#[async_trait]
impl ExternalChannel for NoOpChannel {
    fn name(&self) -> &str {
        "noop"
    }

    async fn deliver(&self, _message: &SynapseMessage) -> Result<(), ChannelError> {
        Ok(())
    }
}
