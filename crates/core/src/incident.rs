// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incident identifier and state machine.

use crate::anomaly::{Anomaly, AnomalyType, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current schema version for persisted incident rows.
pub const INCIDENT_SCHEMA_VERSION: u32 = 1;

crate::define_id! {
    /// Unique identifier for an incident instance.
    #[derive(Default)]
    pub struct IncidentId;
}

/// Incident lifecycle states.
///
/// `detected → diagnosing → remediating → verifying` then one of
/// `resolved`, `remediation_failed`, or `escalated`; `self_resolved` and
/// `dismissed` are terminal-equivalents reachable from any open state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    Detected,
    Diagnosing,
    Remediating,
    Verifying,
    Resolved,
    RemediationFailed,
    Escalated,
    SelfResolved,
    Dismissed,
}

impl IncidentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentState::Detected => "detected",
            IncidentState::Diagnosing => "diagnosing",
            IncidentState::Remediating => "remediating",
            IncidentState::Verifying => "verifying",
            IncidentState::Resolved => "resolved",
            IncidentState::RemediationFailed => "remediation_failed",
            IncidentState::Escalated => "escalated",
            IncidentState::SelfResolved => "self_resolved",
            IncidentState::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "detected" => Some(IncidentState::Detected),
            "diagnosing" => Some(IncidentState::Diagnosing),
            "remediating" => Some(IncidentState::Remediating),
            "verifying" => Some(IncidentState::Verifying),
            "resolved" => Some(IncidentState::Resolved),
            "remediation_failed" => Some(IncidentState::RemediationFailed),
            "escalated" => Some(IncidentState::Escalated),
            "self_resolved" => Some(IncidentState::SelfResolved),
            "dismissed" => Some(IncidentState::Dismissed),
            _ => None,
        }
    }

    /// Terminal states are excluded from the open-incident uniqueness key.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IncidentState::Resolved | IncidentState::SelfResolved | IncidentState::Dismissed
        )
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Epoch milliseconds when the entry was appended.
    pub timestamp: u64,
    pub state: IncidentState,
    /// Who caused the transition ("classifier", "executor", "operator", ...).
    pub actor: String,
    pub note: String,
}

/// A persisted incident instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub anomaly_type: AnomalyType,
    pub target_id: String,
    pub severity: Severity,
    pub state: IncidentState,
    /// Runbook chosen for this incident, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_id: Option<String>,
    pub detected_at: u64,
    pub state_changed_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_tier: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_at: Option<u64>,
    /// Upserts for the same key are suppressed until this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_until: Option<u64>,
    pub audit_trail: Vec<AuditEntry>,
    pub details: serde_json::Value,
    pub schema_version: u32,
}

impl Incident {
    /// Open a new incident from an accepted anomaly.
    pub fn open(id: IncidentId, anomaly: &Anomaly, now_ms: u64) -> Self {
        Self {
            id,
            anomaly_type: anomaly.anomaly_type,
            target_id: anomaly.target_id.clone(),
            severity: anomaly.severity,
            state: IncidentState::Detected,
            runbook_id: anomaly.remediation_hint.clone(),
            detected_at: now_ms,
            state_changed_at: now_ms,
            resolved_at: None,
            escalation_tier: None,
            escalated_at: None,
            dismiss_until: None,
            audit_trail: vec![AuditEntry {
                timestamp: now_ms,
                state: IncidentState::Detected,
                actor: "classifier".to_string(),
                note: format!("anomaly {} on {}", anomaly.anomaly_type, anomaly.target_id),
            }],
            details: anomaly.details.clone(),
            schema_version: INCIDENT_SCHEMA_VERSION,
        }
    }

    /// Synthetic record returned when an upsert hits an active dismiss window.
    /// Never persisted.
    pub fn synthetic_dismissed(anomaly: &Anomaly, now_ms: u64) -> Self {
        Self {
            id: IncidentId::new("dismissed"),
            anomaly_type: anomaly.anomaly_type,
            target_id: anomaly.target_id.clone(),
            severity: anomaly.severity,
            state: IncidentState::Dismissed,
            runbook_id: None,
            detected_at: now_ms,
            state_changed_at: now_ms,
            resolved_at: None,
            escalation_tier: None,
            escalated_at: None,
            dismiss_until: None,
            audit_trail: Vec::new(),
            details: serde_json::Value::Null,
            schema_version: INCIDENT_SCHEMA_VERSION,
        }
    }

    /// Apply a state transition, appending to the audit trail.
    ///
    /// No transition matrix is enforced: an out-of-order transition is
    /// still recorded so the trail stays a faithful forensic record.
    pub fn apply_transition(&mut self, state: IncidentState, actor: &str, note: &str, now_ms: u64) {
        self.state = state;
        self.state_changed_at = now_ms;
        match state {
            IncidentState::Resolved | IncidentState::SelfResolved => {
                self.resolved_at = Some(now_ms);
            }
            IncidentState::Escalated => {
                self.escalated_at = Some(now_ms);
            }
            _ => {}
        }
        self.push_audit(state, actor, note, now_ms);
    }

    /// Append an audit entry. Timestamps must be monotone; a clock that
    /// stepped backwards is pinned to the previous entry's timestamp.
    pub fn push_audit(&mut self, state: IncidentState, actor: &str, note: &str, now_ms: u64) {
        let ts = self
            .audit_trail
            .last()
            .map(|e| e.timestamp.max(now_ms))
            .unwrap_or(now_ms);
        self.audit_trail.push(AuditEntry {
            timestamp: ts,
            state,
            actor: actor.to_string(),
            note: note.to_string(),
        });
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True while a dismiss window covers `now_ms`.
    pub fn is_dismissed_at(&self, now_ms: u64) -> bool {
        self.dismiss_until.is_some_and(|until| until > now_ms)
    }
}

#[cfg(test)]
#[path = "incident_tests.rs"]
mod tests;
