// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use medulla_core::{Anomaly, AnomalyType, FakeClock, IncidentId, SequentialIdGen};
use medulla_synapse::FakeChannel;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    no_runbook = { false, None, 0.9, false, Severity::High, 3 },
    remediation_failed = { true, Some(RunbookMode::AutoExecute), 0.9, true, Severity::High, 3 },
    critical_severity = { true, Some(RunbookMode::AutoExecute), 0.9, false, Severity::Critical, 3 },
    trusted_auto = { true, Some(RunbookMode::AutoExecute), 0.9, false, Severity::High, 0 },
    uncertain_auto = { true, Some(RunbookMode::AutoExecute), 0.5, false, Severity::High, 1 },
    needs_approval = { true, Some(RunbookMode::DryRun), 0.9, false, Severity::High, 2 },
)]
fn tier_selection(
    runbook_exists: bool,
    mode: Option<RunbookMode>,
    confidence: f64,
    failed: bool,
    severity: Severity,
    expect: u8,
) {
    assert_eq!(
        select_tier(runbook_exists, mode, confidence, 0.8, failed, severity),
        expect
    );
}

fn incident(severity: Severity) -> Incident {
    let anomaly = Anomaly {
        id: "a-1".into(),
        anomaly_type: AnomalyType::ProcessDead,
        target_id: "augur-executor".into(),
        severity,
        detected_at: 1_000,
        source_id: "probe".into(),
        details: json!({}),
        remediation_hint: None,
    };
    Incident::open(IncidentId::new("inc-1"), &anomaly, 1_000)
}

struct Rig {
    router: EscalationRouter<SequentialIdGen, FakeClock>,
    bus_channel: FakeChannel,
    guaranteed: FakeChannel,
}

fn rig() -> Rig {
    let bus_channel = FakeChannel::new();
    let guaranteed = FakeChannel::new();
    let synapse = Synapse::new(
        Arc::new(bus_channel.clone()),
        SequentialIdGen::new("msg"),
        FakeClock::new(),
    );
    let router = EscalationRouter::new(
        synapse,
        Arc::new(guaranteed.clone()),
        MetricsSink::open_in_memory().unwrap(),
        0.8,
    );
    Rig {
        router,
        bus_channel,
        guaranteed,
    }
}

fn context(mode: Option<RunbookMode>, confidence: f64, failed: bool) -> EscalationContext {
    EscalationContext {
        runbook_id: mode.map(|_| "rb-restart-service".to_string()),
        runbook_mode: mode,
        confidence,
        remediation_failed: failed,
        summary: "process_dead on augur-executor".into(),
    }
}

#[tokio::test]
async fn tier0_is_silent() {
    let rig = rig();
    let tier = rig
        .router
        .route(
            &incident(Severity::High),
            &context(Some(RunbookMode::AutoExecute), 0.95, false),
        )
        .await
        .unwrap();
    assert_eq!(tier, 0);
    assert!(rig.bus_channel.delivered().is_empty());
    assert!(rig.guaranteed.delivered().is_empty());
}

#[tokio::test]
async fn tier1_sends_info_on_the_bus() {
    let rig = rig();
    let tier = rig
        .router
        .route(
            &incident(Severity::High),
            &context(Some(RunbookMode::AutoExecute), 0.5, false),
        )
        .await
        .unwrap();
    assert_eq!(tier, 1);
    let delivered = rig.bus_channel.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].priority, Priority::Info);
    assert_eq!(delivered[0].thread_id.as_deref(), Some("heal:inc-1"));
}

#[tokio::test]
async fn tier2_asks_for_approval_with_commands() {
    let rig = rig();
    let tier = rig
        .router
        .route(
            &incident(Severity::High),
            &context(Some(RunbookMode::DryRun), 0.6, false),
        )
        .await
        .unwrap();
    assert_eq!(tier, 2);
    let delivered = rig.bus_channel.delivered();
    assert_eq!(delivered[0].priority, Priority::Action);
    assert!(delivered[0].body.contains("approve inc-1"));
    assert!(delivered[0].body.contains("dismiss inc-1"));
}

#[tokio::test]
async fn tier3_delivers_on_both_paths() {
    let rig = rig();
    let tier = rig
        .router
        .route(&incident(Severity::Critical), &context(None, 0.0, false))
        .await
        .unwrap();
    assert_eq!(tier, 3);
    assert_eq!(rig.bus_channel.delivered().len(), 1);
    assert_eq!(rig.bus_channel.delivered()[0].priority, Priority::Urgent);
    assert_eq!(rig.guaranteed.delivered().len(), 1);
}

#[tokio::test]
async fn tier3_bus_failure_does_not_suppress_guaranteed_delivery() {
    let rig = rig();
    rig.bus_channel.set_fail(true);
    let tier = rig
        .router
        .route(&incident(Severity::Critical), &context(None, 0.0, false))
        .await
        .unwrap();
    assert_eq!(tier, 3);
    assert_eq!(rig.guaranteed.delivered().len(), 1);
}

#[tokio::test]
async fn tier3_guaranteed_failure_does_not_suppress_bus_delivery() {
    let rig = rig();
    rig.guaranteed.set_fail(true);
    rig.router
        .route(&incident(Severity::Critical), &context(None, 0.0, false))
        .await
        .unwrap();
    assert_eq!(rig.bus_channel.delivered().len(), 1);
}
