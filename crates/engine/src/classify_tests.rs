// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn classifier() -> AnomalyClassifier {
    AnomalyClassifier::new(default_rules())
}

fn reading(source: &str, data: serde_json::Value) -> Reading {
    Reading::available(source, 1_000, data)
}

#[test]
fn dead_process_classifies_with_hint() {
    let anomalies = classifier().classify(&reading(
        "probe-process:augur-executor",
        json!({"name": "augur-executor", "pid_found": false}),
    ));
    assert_eq!(anomalies.len(), 1);
    let a = &anomalies[0];
    assert_eq!(a.anomaly_type, AnomalyType::ProcessDead);
    assert_eq!(a.target_id, "augur-executor");
    assert_eq!(a.severity, Severity::High);
    assert_eq!(a.remediation_hint.as_deref(), Some("rb-restart-service"));
}

#[test]
fn live_process_produces_no_anomalies() {
    let anomalies = classifier().classify(&reading(
        "probe-process:augur-executor",
        json!({"name": "augur-executor", "pid_found": true, "pids": [4242]}),
    ));
    assert!(anomalies.is_empty());
}

#[parameterized(
    below_watermark = { 80.0, 0 },
    at_watermark = { 95.0, 1 },
    above = { 99.5, 1 },
)]
fn disk_usage_thresholds(pct: f64, expect: usize) {
    let anomalies = classifier().classify(&reading(
        "probe-disk:/var",
        json!({"mount": "/var", "used_pct": pct}),
    ));
    assert_eq!(anomalies.len(), expect);
    if expect == 1 {
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::DiskFull);
        assert_eq!(anomalies[0].target_id, "/var");
    }
}

#[parameterized(
    calm = { 50.0, None },
    pressured = { 92.0, Some(Severity::Medium) },
    critical = { 98.0, Some(Severity::Critical) },
)]
fn memory_rules_are_disjoint(pct: f64, expect: Option<Severity>) {
    let anomalies = classifier().classify(&reading(
        "probe-memory",
        json!({"target": "system-memory", "used_pct": pct}),
    ));
    match expect {
        None => assert!(anomalies.is_empty()),
        Some(severity) => {
            // exactly one rule fires; the key (type, target) stays unique
            assert_eq!(anomalies.len(), 1);
            assert_eq!(anomalies[0].severity, severity);
            assert_eq!(anomalies[0].target_id, "system-memory");
        }
    }
}

#[test]
fn gateway_needs_three_consecutive_failures() {
    let c = classifier();
    let one = c.classify(&reading(
        "probe-gateway:sms",
        json!({"reachable": false, "consecutive_failures": 2}),
    ));
    assert!(one.is_empty());

    let three = c.classify(&reading(
        "probe-gateway:sms",
        json!({"reachable": false, "consecutive_failures": 3}),
    ));
    assert_eq!(three.len(), 1);
    assert_eq!(three[0].anomaly_type, AnomalyType::GatewayUnreachable);
    assert_eq!(three[0].target_id, "sms");
}

#[test]
fn unavailable_readings_classify_to_nothing() {
    let reading = Reading::unavailable("probe-disk:/var", 1_000, "df timed out");
    assert!(classifier().classify(&reading).is_empty());
}

#[test]
fn every_rule_has_a_clear_reading_counterexample() {
    // for each anomaly a rule can emit, a synthetic clear reading exists
    // that yields zero anomalies of that type (verification law)
    let c = classifier();
    let cases = [
        (
            reading("probe-process:x", json!({"name": "x", "pid_found": false})),
            reading("probe-process:x", json!({"name": "x", "pid_found": true})),
        ),
        (
            reading("probe-disk:/", json!({"mount": "/", "used_pct": 99.0})),
            reading("probe-disk:/", json!({"mount": "/", "used_pct": 40.0})),
        ),
        (
            reading("probe-gateway:sms", json!({"reachable": false, "consecutive_failures": 5})),
            reading("probe-gateway:sms", json!({"reachable": true, "consecutive_failures": 0, "latency_ms": 80})),
        ),
    ];
    for (dirty, clean) in cases {
        let fired = c.classify(&dirty);
        assert!(!fired.is_empty());
        let types: Vec<_> = fired.iter().map(|a| a.anomaly_type).collect();
        let clear = c.classify(&clean);
        for ty in types {
            assert!(!clear.iter().any(|a| a.anomaly_type == ty));
        }
    }
}

#[test]
fn classification_is_deterministic() {
    let c = classifier();
    let r = reading("probe-process:x", json!({"name": "x", "pid_found": false}));
    let a = c.classify(&r);
    let b = c.classify(&r);
    assert_eq!(a[0].id, b[0].id);
}

#[test]
fn stale_fires_only_past_threshold() {
    let r = reading("probe-memory", json!({}));
    assert!(AnomalyClassifier::stale(&r, 50_000, 60_000).is_none());
    let anomaly = AnomalyClassifier::stale(&r, 61_000, 60_000).unwrap();
    assert_eq!(anomaly.anomaly_type, AnomalyType::ProbeStale);
    assert_eq!(anomaly.target_id, "probe-memory");
}
