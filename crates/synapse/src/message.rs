// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus message shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery priority of a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Info,
    /// The operator is asked to act (approve/dismiss commands included).
    Action,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Info => "info",
            Priority::Action => "action",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message as fanned out to subscribers and the external channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynapseMessage {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
    /// Messages about one incident/failure share a thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub sent_at: u64,
}
