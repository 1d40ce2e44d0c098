// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bus itself.
//!
//! `send` fans a message out to every in-process subscriber without
//! blocking (a full subscriber mailbox drops the message for that
//! subscriber) and then delivers to the bus's own external channel.
//! Channel failures are reported but never poison the in-process fan-out.

use crate::channel::ExternalChannel;
use crate::message::{Priority, SynapseMessage};
use medulla_core::{Clock, IdGen};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of each subscriber mailbox.
const SUBSCRIBER_MAILBOX: usize = 64;

/// Errors from bus operations.
#[derive(Debug, Error)]
pub enum SynapseError {
    #[error("external delivery failed: {0}")]
    External(#[from] crate::channel::ChannelError),
}

/// In-process message bus with one external delivery channel.
#[derive(Clone)]
pub struct Synapse<I: IdGen, C: Clock> {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<SynapseMessage>>>>,
    external: Arc<dyn ExternalChannel>,
    idgen: I,
    clock: C,
}

impl<I: IdGen, C: Clock> Synapse<I, C> {
    pub fn new(external: Arc<dyn ExternalChannel>, idgen: I, clock: C) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            external,
            idgen,
            clock,
        }
    }

    /// Register an in-process subscriber; returns its mailbox.
    pub fn subscribe(&self) -> mpsc::Receiver<SynapseMessage> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_MAILBOX);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Send a message: in-process fan-out, then external delivery.
    ///
    /// Returns the message (with its assigned id) on success. An external
    /// delivery failure is an error, but subscribers have already been
    /// notified by then.
    pub async fn send(
        &self,
        subject: &str,
        body: &str,
        priority: Priority,
        thread_id: Option<&str>,
    ) -> Result<SynapseMessage, SynapseError> {
        let message = SynapseMessage {
            id: self.idgen.next(),
            subject: subject.to_string(),
            body: body.to_string(),
            priority,
            thread_id: thread_id.map(str::to_string),
            sent_at: self.clock.epoch_ms(),
        };

        self.fan_out(&message);

        tracing::debug!(
            subject,
            priority = %priority,
            thread = thread_id.unwrap_or(""),
            "synapse send"
        );

        self.external.deliver(&message).await?;
        Ok(message)
    }

    fn fan_out(&self, message: &SynapseMessage) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(subject = %message.subject, "subscriber mailbox full, dropping");
                true
            }
            // receiver dropped; unregister
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
