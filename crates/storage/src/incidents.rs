// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incident rows.
//!
//! Key columns carry what queries filter on; the full incident (audit
//! trail included) round-trips through the `body` JSON column.

use crate::store::{Store, StoreError};
use medulla_core::{AnomalyType, Incident, IncidentState};

/// Repository over the `incidents` table.
#[derive(Clone)]
pub struct IncidentRepo {
    store: Store,
}

impl IncidentRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Insert a freshly opened incident.
    ///
    /// The partial unique index over open `(anomaly_type, target_id)`
    /// enforces the single-open-incident invariant; a violation surfaces
    /// as a [`StoreError::Conflict`].
    pub fn insert(&self, incident: &Incident) -> Result<(), StoreError> {
        let body = serde_json::to_string(incident)?;
        let dismiss_until = incident.dismiss_until.map(|v| v as i64);
        let result = self.store.run(
            "INSERT INTO incidents (id, anomaly_type, target_id, state, dismiss_until, detected_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &[
                &incident.id.as_str(),
                &incident.anomaly_type.as_str(),
                &incident.target_id,
                &incident.state.as_str(),
                &dismiss_until,
                &(incident.detected_at as i64),
                &body,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(StoreError::Sql(e)) if e.to_string().contains("UNIQUE constraint") => {
                Err(StoreError::Conflict(format!(
                    "open incident already exists for ({}, {})",
                    incident.anomaly_type, incident.target_id
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Rewrite an incident row after a state change.
    pub fn update(&self, incident: &Incident) -> Result<(), StoreError> {
        let body = serde_json::to_string(incident)?;
        let dismiss_until = incident.dismiss_until.map(|v| v as i64);
        let n = self.store.run(
            "UPDATE incidents
             SET state = ?2, dismiss_until = ?3, detected_at = ?4, body = ?5
             WHERE id = ?1",
            &[
                &incident.id.as_str(),
                &incident.state.as_str(),
                &dismiss_until,
                &(incident.detected_at as i64),
                &body,
            ],
        )?;
        if n == 0 {
            return Err(StoreError::Conflict(format!(
                "incident {} vanished during update",
                incident.id
            )));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        let body: Option<String> = self.store.get(
            "SELECT body FROM incidents WHERE id = ?1",
            &[&id],
            |row| row.get(0),
        )?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// The open (non-terminal) incident for a key, if any.
    pub fn find_open(
        &self,
        anomaly_type: AnomalyType,
        target_id: &str,
    ) -> Result<Option<Incident>, StoreError> {
        let body: Option<String> = self.store.get(
            "SELECT body FROM incidents
             WHERE anomaly_type = ?1 AND target_id = ?2
               AND state NOT IN ('resolved', 'self_resolved', 'dismissed')",
            &[&anomaly_type.as_str(), &target_id],
            |row| row.get(0),
        )?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// The most recent dismissed incident for a key whose window covers `now_ms`.
    pub fn find_active_dismissal(
        &self,
        anomaly_type: AnomalyType,
        target_id: &str,
        now_ms: u64,
    ) -> Result<Option<Incident>, StoreError> {
        let body: Option<String> = self.store.get(
            "SELECT body FROM incidents
             WHERE anomaly_type = ?1 AND target_id = ?2
               AND state = 'dismissed' AND dismiss_until > ?3
             ORDER BY dismiss_until DESC
             LIMIT 1",
            &[&anomaly_type.as_str(), &target_id, &(now_ms as i64)],
            |row| row.get(0),
        )?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// All open incidents, oldest first.
    pub fn open_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        let bodies: Vec<String> = self.store.all(
            "SELECT body FROM incidents
             WHERE state NOT IN ('resolved', 'self_resolved', 'dismissed')
             ORDER BY detected_at ASC",
            &[],
            |row| row.get(0),
        )?;
        bodies
            .into_iter()
            .map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .collect()
    }

    /// Delete terminal incidents whose last change predates `cutoff_ms`.
    pub fn purge_terminal_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        self.store.run(
            "DELETE FROM incidents
             WHERE state IN ('resolved', 'self_resolved', 'dismissed')
               AND detected_at < ?1
               AND (dismiss_until IS NULL OR dismiss_until < ?1)",
            &[&(cutoff_ms as i64)],
        )
    }

    /// Count of incidents currently in the given state (diagnostics).
    pub fn count_in_state(&self, state: IncidentState) -> Result<i64, StoreError> {
        Ok(self
            .store
            .get(
                "SELECT COUNT(*) FROM incidents WHERE state = ?1",
                &[&state.as_str()],
                |row| row.get(0),
            )?
            .unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "incidents_tests.rs"]
mod tests;
