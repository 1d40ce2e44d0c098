//! Scenario: dead process → restart runbook → verified resolution,
//! silent tier-0 escalation.

use crate::prelude::*;
use medulla_adapters::DataSourceAdapter;
use medulla_core::{
    Anomaly, AnomalyType, HealingConfig, IncidentState, RunbookMode, Severity,
};
use medulla_engine::{
    default_rules, AnomalyClassifier, EscalationContext, EscalationRouter, IncidentManager,
    ProbeSet, RunbookExecutor, Upsert,
};
use medulla_runbook::{FnStepRunner, RunbookDefinition, Step, StepContext, StepResult};
use medulla_storage::{IncidentRepo, MetricsSink, RunbookMetaRepo};
use medulla_synapse::{FakeChannel, Synapse};
use serde_json::json;
use std::sync::Arc;

const SOURCE: &str = "probe-process:augur-executor";

struct RestartService {
    probe: Arc<medulla_adapters::FakeProbe>,
}

impl RunbookDefinition for RestartService {
    fn id(&self) -> &str {
        "rb-restart-service"
    }

    fn label(&self) -> &str {
        "Restart dead service"
    }

    fn applies_to(&self) -> &[AnomalyType] {
        &[AnomalyType::ProcessDead]
    }

    fn auto_approve_whitelist(&self) -> bool {
        true
    }

    fn build(&self, _anomaly: &Anomaly) -> Vec<Step> {
        let probe = self.probe.clone();
        vec![
            Step::custom(
                "kill-old",
                "stop the dead process",
                "Would pkill augur-executor",
                Arc::new(FnStepRunner(|_: &StepContext| StepResult::success("killed"))),
                10_000,
            ),
            Step::custom(
                "start-service",
                "start the service",
                "Would start augur-executor",
                Arc::new(FnStepRunner(move |_: &StepContext| {
                    probe.set_mock_data(json!({"name": "augur-executor", "pid_found": true}));
                    StepResult::success("started")
                })),
                10_000,
            ),
            Step::custom(
                "verify-pid",
                "confirm the pid",
                "Would pgrep augur-executor",
                Arc::new(FnStepRunner(|_: &StepContext| StepResult::success("pid 4242"))),
                10_000,
            ),
        ]
    }
}

#[tokio::test]
async fn process_dead_restart_resolves_with_silent_tier0() {
    let store = store();
    let clock = clock();
    let probe = probe(SOURCE);
    let classifier = AnomalyClassifier::new(default_rules());
    let incidents = IncidentManager::new(IncidentRepo::new(store.clone()), idgen("inc"), clock.clone());
    let meta = RunbookMetaRepo::new(store);

    let mut config = HealingConfig::default();
    config.verification_interval_ms = 1;
    config.confidence_auto_execute = 0.55;
    config.auto_execute_whitelist = vec!["rb-restart-service".to_string()];

    let executor = RunbookExecutor::new(
        classifier.as_fn(),
        ProbeSet::new(vec![probe.clone() as Arc<dyn medulla_adapters::DataSourceAdapter>]),
        incidents.clone(),
        meta.clone(),
        MetricsSink::open_in_memory().unwrap(),
        config.clone(),
        clock.clone(),
    );

    // graduate the runbook: three rehearsals plus the whitelist
    for i in 0..3 {
        meta.record_dry_run("rb-restart-service", i, 3, &config.auto_execute_whitelist)
            .unwrap();
    }
    assert_eq!(
        meta.get("rb-restart-service").unwrap().unwrap().mode,
        RunbookMode::AutoExecute
    );

    // the probe reads a dead process
    probe.set_mock_data(json!({"name": "augur-executor", "pid_found": false}));
    let reading = probe.poll().await;
    let anomalies = classifier.classify(&reading);
    assert_eq!(anomalies.len(), 1);
    let anomaly = &anomalies[0];
    assert_eq!(anomaly.anomaly_type, AnomalyType::ProcessDead);
    assert_eq!(anomaly.target_id, "augur-executor");
    assert_eq!(anomaly.severity, Severity::High);

    // upsert opens the incident in `detected`
    let incident = match incidents.upsert(anomaly).unwrap() {
        Upsert::Opened(incident) => incident,
        other => panic!("expected Opened, got {other:?}"),
    };
    assert_eq!(incident.state, IncidentState::Detected);

    // execute: pre-probe still dead, steps run, post-verification clear
    let definition: Arc<dyn RunbookDefinition> = Arc::new(RestartService { probe: probe.clone() });
    let result = executor
        .execute(&definition, &incident, anomaly, false)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.mode, RunbookMode::AutoExecute);
    let step_ids: Vec<&str> = result.steps_executed.iter().map(|s| s.step_id.as_str()).collect();
    assert_eq!(step_ids, vec!["kill-old", "start-service", "verify-pid"]);
    assert_eq!(result.verification_passed, Some(true));
    assert!(!result.escalation_needed);

    let stored = incidents.repo().get(incident.id.as_str()).unwrap().unwrap();
    assert_eq!(stored.state, IncidentState::Resolved);

    // escalation: graduated runbook above the confidence bar is silent
    let bus_channel = FakeChannel::new();
    let guaranteed = FakeChannel::new();
    let synapse = Synapse::new(Arc::new(bus_channel.clone()), idgen("msg"), clock);
    let router = EscalationRouter::new(
        synapse,
        Arc::new(guaranteed.clone()),
        MetricsSink::open_in_memory().unwrap(),
        config.confidence_auto_execute,
    );

    let meta_now = meta.get("rb-restart-service").unwrap().unwrap();
    let tier = router
        .route(
            &stored,
            &EscalationContext {
                runbook_id: Some("rb-restart-service".into()),
                runbook_mode: Some(RunbookMode::AutoExecute),
                confidence: meta_now.confidence,
                remediation_failed: false,
                summary: "restored".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(tier, 0);
    assert!(bus_channel.delivered().is_empty());
    assert!(guaranteed.delivered().is_empty());
}
