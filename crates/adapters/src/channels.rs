// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External delivery channel implementations.

use crate::subprocess::{run_argv, VCS_COMMAND_TIMEOUT};
use async_trait::async_trait;
use medulla_synapse::{ChannelError, ExternalChannel, SynapseMessage};

/// Desktop notification channel using notify-rust.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopChannel;

impl DesktopChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExternalChannel for DesktopChannel {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn deliver(&self, message: &SynapseMessage) -> Result<(), ChannelError> {
        let title = format!("[{}] {}", message.priority, message.subject);
        let body = message.body.clone();
        // notify_rust::Notification::show() is synchronous on some
        // platforms. Fire-and-forget on tokio's bounded blocking thread
        // pool to avoid blocking the async runtime.
        tokio::task::spawn_blocking(move || {
            match notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .show()
            {
                Ok(_) => {
                    tracing::debug!(%title, "desktop notification sent");
                }
                Err(e) => {
                    tracing::warn!(%title, error = %e, "desktop notification failed");
                }
            }
        });
        Ok(())
    }
}

/// Guaranteed delivery via a configured list-form command.
///
/// The command (an SMS gateway script, a channel adapter's CLI) receives
/// the subject and body as its last two arguments. A nonzero exit is a
/// delivery failure the caller must surface.
pub struct CommandChannel {
    name: String,
    argv: Vec<String>,
}

impl CommandChannel {
    pub fn new(name: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            name: name.into(),
            argv,
        }
    }
}

#[async_trait]
impl ExternalChannel for CommandChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, message: &SynapseMessage) -> Result<(), ChannelError> {
        let mut argv = self.argv.clone();
        argv.push(message.subject.clone());
        argv.push(message.body.clone());
        let output = run_argv(&argv, None, VCS_COMMAND_TIMEOUT, "channel command")
            .await
            .map_err(ChannelError::DeliveryFailed)?;
        if !output.status.success() {
            return Err(ChannelError::DeliveryFailed(format!(
                "channel {} exited {}",
                self.name,
                output.status.code().unwrap_or(-1)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "channels_tests.rs"]
mod tests;
