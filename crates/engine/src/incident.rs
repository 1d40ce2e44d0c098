// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incident manager: upsert, transition, dismiss.

use crate::error::HealingError;
use medulla_core::{Anomaly, AnomalyType, Clock, IdGen, Incident, IncidentId, IncidentState};
use medulla_storage::{IncidentRepo, StoreError};

/// Outcome of an upsert.
#[derive(Debug, Clone)]
pub enum Upsert {
    /// A new incident was opened.
    Opened(Incident),
    /// An existing open incident was refreshed.
    Refreshed(Incident),
    /// An active dismiss window suppressed the anomaly; the carried
    /// incident is synthetic and was not persisted.
    Dismissed(Incident),
}

impl Upsert {
    pub fn incident(&self) -> &Incident {
        match self {
            Upsert::Opened(i) | Upsert::Refreshed(i) | Upsert::Dismissed(i) => i,
        }
    }

    pub fn is_dismissed(&self) -> bool {
        matches!(self, Upsert::Dismissed(_))
    }
}

/// State machine driver over the incident table.
#[derive(Clone)]
pub struct IncidentManager<I: IdGen, C: Clock> {
    repo: IncidentRepo,
    idgen: I,
    clock: C,
}

impl<I: IdGen, C: Clock> IncidentManager<I, C> {
    pub fn new(repo: IncidentRepo, idgen: I, clock: C) -> Self {
        Self { repo, idgen, clock }
    }

    pub fn repo(&self) -> &IncidentRepo {
        &self.repo
    }

    /// Open a new incident or refresh the existing open one for the same
    /// `(anomaly_type, target_id)`. A key inside an active dismiss window
    /// is a no-op returning a synthetic dismissed record.
    pub fn upsert(&self, anomaly: &Anomaly) -> Result<Upsert, HealingError> {
        let now = self.clock.epoch_ms();

        if self.is_dismissed(anomaly.anomaly_type, &anomaly.target_id)? {
            tracing::debug!(
                anomaly_type = %anomaly.anomaly_type,
                target = %anomaly.target_id,
                "anomaly suppressed by dismiss window"
            );
            return Ok(Upsert::Dismissed(Incident::synthetic_dismissed(anomaly, now)));
        }

        if let Some(mut incident) = self
            .repo
            .find_open(anomaly.anomaly_type, &anomaly.target_id)?
        {
            incident.detected_at = now;
            incident.severity = incident.severity.max(anomaly.severity);
            incident.push_audit(incident.state, "classifier", "re-detected", now);
            self.repo.update(&incident)?;
            return Ok(Upsert::Refreshed(incident));
        }

        let incident = Incident::open(IncidentId::new(self.idgen.next()), anomaly, now);
        match self.repo.insert(&incident) {
            Ok(()) => {
                tracing::info!(
                    incident = %incident.id,
                    anomaly_type = %anomaly.anomaly_type,
                    target = %anomaly.target_id,
                    severity = %anomaly.severity,
                    "incident opened"
                );
                Ok(Upsert::Opened(incident))
            }
            // lost a race with a concurrent upsert; refresh theirs
            Err(StoreError::Conflict(_)) => {
                let mut existing = self
                    .repo
                    .find_open(anomaly.anomaly_type, &anomaly.target_id)?
                    .ok_or_else(|| {
                        HealingError::IncidentNotFound(format!(
                            "({}, {})",
                            anomaly.anomaly_type, anomaly.target_id
                        ))
                    })?;
                existing.push_audit(existing.state, "classifier", "re-detected", now);
                self.repo.update(&existing)?;
                Ok(Upsert::Refreshed(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a transition and persist. Invalid transitions are recorded,
    /// not rejected.
    pub fn transition(
        &self,
        id: &str,
        state: IncidentState,
        actor: &str,
        note: &str,
    ) -> Result<Incident, HealingError> {
        let mut incident = self
            .repo
            .get(id)?
            .ok_or_else(|| HealingError::IncidentNotFound(id.to_string()))?;
        incident.apply_transition(state, actor, note, self.clock.epoch_ms());
        self.repo.update(&incident)?;
        tracing::info!(incident = %id, state = %state, actor, "incident transition");
        Ok(incident)
    }

    /// Dismiss an incident and suppress its key for `window_ms`.
    pub fn dismiss(
        &self,
        id: &str,
        reason: &str,
        window_ms: u64,
    ) -> Result<Incident, HealingError> {
        let mut incident = self
            .repo
            .get(id)?
            .ok_or_else(|| HealingError::IncidentNotFound(id.to_string()))?;
        let now = self.clock.epoch_ms();
        incident.dismiss_until = Some(now + window_ms);
        incident.apply_transition(
            IncidentState::Dismissed,
            "operator",
            &format!("dismissed for {window_ms}ms: {reason}"),
            now,
        );
        self.repo.update(&incident)?;
        Ok(incident)
    }

    /// Whether an active dismiss window covers this key right now.
    pub fn is_dismissed(
        &self,
        anomaly_type: AnomalyType,
        target_id: &str,
    ) -> Result<bool, HealingError> {
        Ok(self
            .repo
            .find_active_dismissal(anomaly_type, target_id, self.clock.epoch_ms())?
            .is_some())
    }
}

#[cfg(test)]
#[path = "incident_tests.rs"]
mod tests;
