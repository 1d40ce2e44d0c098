//! Scenario: a dismissed key suppresses upserts for the whole window.

use crate::prelude::*;
use medulla_core::{Anomaly, AnomalyType, IncidentState, Severity};
use medulla_engine::{IncidentManager, Upsert};
use medulla_storage::IncidentRepo;
use serde_json::json;
use std::time::Duration;

fn memory_pressure() -> Anomaly {
    Anomaly {
        id: "a-mem".into(),
        anomaly_type: AnomalyType::MemoryPressure,
        target_id: "system-memory".into(),
        severity: Severity::Medium,
        detected_at: 0,
        source_id: "probe-memory".into(),
        details: json!({"used_pct": 93.0}),
        remediation_hint: None,
    }
}

#[test]
fn dismissed_key_returns_synthetic_record_without_rows() {
    let clock = clock();
    let incidents = IncidentManager::new(
        IncidentRepo::new(store()),
        idgen("inc"),
        clock.clone(),
    );

    let opened = incidents.upsert(&memory_pressure()).unwrap();
    incidents
        .dismiss(opened.incident().id.as_str(), "known noisy host", 86_400_000)
        .unwrap();

    // within the window: synthetic dismissed record, no new row
    let suppressed = incidents.upsert(&memory_pressure()).unwrap();
    assert!(suppressed.is_dismissed());
    assert_eq!(suppressed.incident().id, "dismissed");
    assert_eq!(suppressed.incident().state, IncidentState::Dismissed);
    assert!(incidents.repo().open_incidents().unwrap().is_empty());

    // an hour before expiry, still suppressed
    clock.advance(Duration::from_millis(86_400_000 - 3_600_000));
    assert!(incidents.upsert(&memory_pressure()).unwrap().is_dismissed());

    // past the window the key opens again
    clock.advance(Duration::from_millis(3_600_001));
    let reopened = incidents.upsert(&memory_pressure()).unwrap();
    assert!(matches!(reopened, Upsert::Opened(_)));
}
