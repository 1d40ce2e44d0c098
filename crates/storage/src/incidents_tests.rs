// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{run_migrations, Store};
use medulla_core::{Anomaly, IncidentId, Severity};
use serde_json::json;

fn repo() -> IncidentRepo {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();
    IncidentRepo::new(store)
}

fn anomaly(target: &str) -> Anomaly {
    Anomaly {
        id: "a-1".into(),
        anomaly_type: AnomalyType::ProcessDead,
        target_id: target.into(),
        severity: Severity::High,
        detected_at: 1_000,
        source_id: "probe-process".into(),
        details: json!({"pid_found": false}),
        remediation_hint: None,
    }
}

#[test]
fn insert_and_get_round_trip() {
    let repo = repo();
    let incident = Incident::open(IncidentId::new("inc-1"), &anomaly("svc-a"), 1_000);
    repo.insert(&incident).unwrap();

    let loaded = repo.get("inc-1").unwrap().unwrap();
    assert_eq!(loaded.target_id, "svc-a");
    assert_eq!(loaded.state, IncidentState::Detected);
    assert_eq!(loaded.audit_trail.len(), 1);
}

#[test]
fn second_open_insert_for_same_key_is_a_conflict() {
    let repo = repo();
    repo.insert(&Incident::open(IncidentId::new("inc-1"), &anomaly("svc-a"), 1_000))
        .unwrap();
    let err = repo
        .insert(&Incident::open(IncidentId::new("inc-2"), &anomaly("svc-a"), 2_000))
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[test]
fn terminal_row_frees_the_key() {
    let repo = repo();
    let mut incident = Incident::open(IncidentId::new("inc-1"), &anomaly("svc-a"), 1_000);
    repo.insert(&incident).unwrap();

    incident.apply_transition(IncidentState::Resolved, "executor", "ok", 2_000);
    repo.update(&incident).unwrap();

    repo.insert(&Incident::open(IncidentId::new("inc-2"), &anomaly("svc-a"), 3_000))
        .unwrap();
    let open = repo.find_open(AnomalyType::ProcessDead, "svc-a").unwrap().unwrap();
    assert_eq!(open.id, "inc-2");
}

#[test]
fn find_open_ignores_other_targets() {
    let repo = repo();
    repo.insert(&Incident::open(IncidentId::new("inc-1"), &anomaly("svc-a"), 1_000))
        .unwrap();
    assert!(repo.find_open(AnomalyType::ProcessDead, "svc-b").unwrap().is_none());
}

#[test]
fn active_dismissal_is_found_within_window() {
    let repo = repo();
    let mut incident = Incident::open(IncidentId::new("inc-1"), &anomaly("svc-a"), 1_000);
    incident.dismiss_until = Some(90_000);
    incident.apply_transition(IncidentState::Dismissed, "operator", "noisy", 2_000);
    repo.insert(&incident).unwrap();

    assert!(repo
        .find_active_dismissal(AnomalyType::ProcessDead, "svc-a", 89_999)
        .unwrap()
        .is_some());
    assert!(repo
        .find_active_dismissal(AnomalyType::ProcessDead, "svc-a", 90_000)
        .unwrap()
        .is_none());
}

#[test]
fn purge_removes_only_old_terminal_rows() {
    let repo = repo();
    let mut resolved = Incident::open(IncidentId::new("inc-old"), &anomaly("svc-a"), 1_000);
    resolved.apply_transition(IncidentState::Resolved, "executor", "ok", 1_500);
    repo.insert(&resolved).unwrap();

    let open = Incident::open(IncidentId::new("inc-live"), &anomaly("svc-b"), 1_000);
    repo.insert(&open).unwrap();

    let purged = repo.purge_terminal_before(10_000).unwrap();
    assert_eq!(purged, 1);
    assert!(repo.get("inc-old").unwrap().is_none());
    assert!(repo.get("inc-live").unwrap().is_some());
}

#[test]
fn update_of_missing_row_is_a_conflict() {
    let repo = repo();
    let incident = Incident::open(IncidentId::new("ghost"), &anomaly("svc-a"), 1_000);
    let err = repo.update(&incident).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}
