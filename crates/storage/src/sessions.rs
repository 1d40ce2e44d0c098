// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session snapshot rows for cross-session continuity.

use crate::store::{Store, StoreError};
use medulla_core::SessionState;

/// Repository over the `sessions` table.
#[derive(Clone)]
pub struct SessionRepo {
    store: Store,
}

impl SessionRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn save(&self, session: &SessionState) -> Result<(), StoreError> {
        let body = serde_json::to_string(session)?;
        let end_time = session.end_time.map(|v| v as i64);
        self.store.run(
            "INSERT INTO sessions (session_id, start_time, end_time, channel, body)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(session_id) DO UPDATE SET
               end_time = excluded.end_time,
               body = excluded.body",
            &[
                &session.session_id,
                &(session.start_time as i64),
                &end_time,
                &session.channel,
                &body,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        let body: Option<String> = self.store.get(
            "SELECT body FROM sessions WHERE session_id = ?1",
            &[&session_id],
            |row| row.get(0),
        )?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// Ended sessions within the lookback window, newest first.
    pub fn ended_since(&self, since_ms: u64) -> Result<Vec<SessionState>, StoreError> {
        let bodies: Vec<String> = self.store.all(
            "SELECT body FROM sessions
             WHERE end_time IS NOT NULL AND end_time >= ?1
             ORDER BY end_time DESC",
            &[&(since_ms as i64)],
            |row| row.get(0),
        )?;
        bodies
            .into_iter()
            .map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .collect()
    }

    /// Drop sessions that ended before `cutoff_ms`.
    pub fn purge_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        self.store.run(
            "DELETE FROM sessions WHERE end_time IS NOT NULL AND end_time < ?1",
            &[&(cutoff_ms as i64)],
        )
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
