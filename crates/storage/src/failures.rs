// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure events, propagation records, and regression-test rows.

use crate::store::{Store, StoreError};
use medulla_core::{FailureEvent, PropagationRecord, PropagationStatus};
use serde::{Deserialize, Serialize};

/// Persisted regression-test stub reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTestRow {
    pub id: String,
    pub failure_id: String,
    pub file_path: String,
    pub created_at: u64,
}

/// Repository over `failure_events`, `propagation_records`, and
/// `regression_tests`.
#[derive(Clone)]
pub struct FailureRepo {
    store: Store,
}

impl FailureRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn insert(&self, event: &FailureEvent) -> Result<(), StoreError> {
        let body = serde_json::to_string(event)?;
        self.store.run(
            "INSERT INTO failure_events
             (id, detected_at, failure_type, root_cause, propagation_status, recurrence_count, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &[
                &event.id,
                &(event.detected_at as i64),
                &event.failure_type.as_str(),
                &event.root_cause,
                &event.propagation_status.as_str(),
                &(event.recurrence_count as i64),
                &body,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<FailureEvent>, StoreError> {
        let body: Option<String> = self.store.get(
            "SELECT body FROM failure_events WHERE id = ?1",
            &[&id],
            |row| row.get(0),
        )?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// Advance `propagation_status`, enforcing the forward-only contract.
    pub fn advance_status(
        &self,
        event: &mut FailureEvent,
        next: PropagationStatus,
    ) -> Result<(), StoreError> {
        if !event.propagation_status.can_advance_to(next) {
            return Err(StoreError::Conflict(format!(
                "propagation status may not move {} -> {}",
                event.propagation_status, next
            )));
        }
        event.propagation_status = next;
        self.rewrite(event)
    }

    /// Increment the recurrence counter (monotone) and stamp the time.
    pub fn record_recurrence(
        &self,
        event: &mut FailureEvent,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        event.recurrence_count += 1;
        event.last_recurred_at = Some(now_ms);
        self.rewrite(event)
    }

    fn rewrite(&self, event: &FailureEvent) -> Result<(), StoreError> {
        let body = serde_json::to_string(event)?;
        let n = self.store.run(
            "UPDATE failure_events
             SET root_cause = ?2, propagation_status = ?3, recurrence_count = ?4, body = ?5
             WHERE id = ?1",
            &[
                &event.id,
                &event.root_cause,
                &event.propagation_status.as_str(),
                &(event.recurrence_count as i64),
                &body,
            ],
        )?;
        if n == 0 {
            return Err(StoreError::Conflict(format!(
                "failure event {} vanished during update",
                event.id
            )));
        }
        Ok(())
    }

    /// Prior failures sharing a root cause within the window, newest first.
    /// Excludes the failure itself.
    pub fn find_by_root_cause_since(
        &self,
        root_cause: &str,
        since_ms: u64,
        exclude_id: &str,
    ) -> Result<Vec<FailureEvent>, StoreError> {
        let bodies: Vec<String> = self.store.all(
            "SELECT body FROM failure_events
             WHERE root_cause = ?1 AND detected_at >= ?2 AND id != ?3
             ORDER BY detected_at DESC",
            &[&root_cause, &(since_ms as i64), &exclude_id],
            |row| row.get(0),
        )?;
        bodies
            .into_iter()
            .map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .collect()
    }

    // --- propagation records ---

    pub fn insert_propagation(&self, record: &PropagationRecord) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)?;
        self.store.run(
            "INSERT INTO propagation_records (id, failure_id, propagation_type, status, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                &record.id,
                &record.failure_id,
                &record.propagation_type.as_str(),
                &record.status,
                &body,
            ],
        )?;
        Ok(())
    }

    pub fn update_propagation(&self, record: &PropagationRecord) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)?;
        self.store.run(
            "UPDATE propagation_records SET status = ?2, body = ?3 WHERE id = ?1",
            &[&record.id, &record.status, &body],
        )?;
        Ok(())
    }

    pub fn propagations_for(&self, failure_id: &str) -> Result<Vec<PropagationRecord>, StoreError> {
        let bodies: Vec<String> = self.store.all(
            "SELECT body FROM propagation_records WHERE failure_id = ?1 ORDER BY id",
            &[&failure_id],
            |row| row.get(0),
        )?;
        bodies
            .into_iter()
            .map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .collect()
    }

    // --- regression test rows ---

    pub fn insert_regression_test(&self, row: &RegressionTestRow) -> Result<(), StoreError> {
        self.store.run(
            "INSERT INTO regression_tests (id, failure_id, file_path, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            &[
                &row.id,
                &row.failure_id,
                &row.file_path,
                &(row.created_at as i64),
            ],
        )?;
        Ok(())
    }

    pub fn regression_tests_for(&self, failure_id: &str) -> Result<Vec<RegressionTestRow>, StoreError> {
        self.store.all(
            "SELECT id, failure_id, file_path, created_at FROM regression_tests
             WHERE failure_id = ?1",
            &[&failure_id],
            |row| {
                Ok(RegressionTestRow {
                    id: row.get(0)?,
                    failure_id: row.get(1)?,
                    file_path: row.get(2)?,
                    created_at: row.get::<_, i64>(3)? as u64,
                })
            },
        )
    }
}

#[cfg(test)]
#[path = "failures_tests.rs"]
mod tests;
