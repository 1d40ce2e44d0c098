// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-session continuity state.

use serde::{Deserialize, Serialize};

/// Current schema version for persisted session snapshots.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// End-of-session snapshot, persisted for the configured lookback window.
///
/// `relevance_score` is computed at restore time only and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub start_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    /// Channel the session ran on ("signal", "telegram", "cli", ...).
    pub channel: String,
    pub working_memory: Vec<String>,
    /// Frequency-ranked topical terms, stop-words removed.
    pub hot_topics: Vec<String>,
    /// Derived from working-directory patterns.
    pub active_projects: Vec<String>,
    pub pending_tasks: Vec<String>,
    pub recent_learnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_session_id: Option<String>,
    /// Session that inherited from this one, set at restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continued_by: Option<String>,
    pub schema_version: u32,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, channel: impl Into<String>, start_time: u64) -> Self {
        Self {
            session_id: session_id.into(),
            start_time,
            end_time: None,
            channel: channel.into(),
            working_memory: Vec::new(),
            hot_topics: Vec::new(),
            active_projects: Vec::new(),
            pending_tasks: Vec::new(),
            recent_learnings: Vec::new(),
            previous_session_id: None,
            continued_by: None,
            schema_version: SESSION_SCHEMA_VERSION,
        }
    }
}
