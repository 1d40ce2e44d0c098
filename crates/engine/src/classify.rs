// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anomaly classifier: a pure rule table from readings to anomalies.
//!
//! All threshold knowledge lives in the rules; the classifier body has no
//! per-source branching and never errors.

use medulla_core::{Anomaly, AnomalyType, Reading, Severity};
use std::sync::Arc;

/// How a rule derives the anomaly's target id from a reading.
#[derive(Clone)]
pub enum TargetSpec {
    /// A fixed target (for example `system-memory`).
    Fixed(String),
    /// Read a string field out of the reading payload.
    FromField(String),
    /// Everything after the `:` in the source id (`probe-gateway:sms` → `sms`).
    SourceSuffix,
}

impl TargetSpec {
    fn resolve(&self, reading: &Reading) -> Option<String> {
        match self {
            TargetSpec::Fixed(target) => Some(target.clone()),
            TargetSpec::FromField(field) => reading.str_field(field).map(str::to_string),
            TargetSpec::SourceSuffix => reading
                .source_id
                .split_once(':')
                .map(|(_, suffix)| suffix.to_string()),
        }
    }
}

/// One classification rule.
#[derive(Clone)]
pub struct ClassifierRule {
    /// Matched against the reading's source id by prefix.
    pub source_prefix: String,
    pub predicate: Arc<dyn Fn(&Reading) -> bool + Send + Sync>,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub target: TargetSpec,
    pub remediation_hint: Option<String>,
}

/// Capability injected into collaborators that must re-classify
/// (the runbook executor's verification path).
pub type ClassifyFn = Arc<dyn Fn(&Reading) -> Vec<Anomaly> + Send + Sync>;

/// Rule-table classifier.
#[derive(Clone, Default)]
pub struct AnomalyClassifier {
    rules: Vec<ClassifierRule>,
}

impl AnomalyClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Classify one reading. Unavailable readings produce nothing; probe
    /// health is the monitor's concern, not a rule's.
    pub fn classify(&self, reading: &Reading) -> Vec<Anomaly> {
        if !reading.available {
            return Vec::new();
        }
        let mut anomalies = Vec::new();
        for rule in &self.rules {
            if !reading.source_id.starts_with(&rule.source_prefix) {
                continue;
            }
            if !(rule.predicate)(reading) {
                continue;
            }
            let Some(target_id) = rule.target.resolve(reading) else {
                continue;
            };
            anomalies.push(Anomaly {
                // deterministic id: same reading classifies identically
                id: format!("{}:{}:{}", rule.anomaly_type, target_id, reading.captured_at),
                anomaly_type: rule.anomaly_type,
                target_id,
                severity: rule.severity,
                detected_at: reading.captured_at,
                source_id: reading.source_id.clone(),
                details: reading.data.clone(),
                remediation_hint: rule.remediation_hint.clone(),
            });
        }
        anomalies
    }

    /// Staleness check applied by the monitor against the probe's own
    /// freshness threshold.
    pub fn stale(reading: &Reading, age_ms: u64, threshold_ms: u64) -> Option<Anomaly> {
        if age_ms <= threshold_ms {
            return None;
        }
        Some(Anomaly {
            id: format!("probe_stale:{}:{}", reading.source_id, reading.captured_at),
            anomaly_type: AnomalyType::ProbeStale,
            target_id: reading.source_id.clone(),
            severity: Severity::Low,
            detected_at: reading.captured_at,
            source_id: reading.source_id.clone(),
            details: serde_json::json!({ "age_ms": age_ms, "threshold_ms": threshold_ms }),
            remediation_hint: None,
        })
    }

    /// The classifier as an injectable capability.
    pub fn as_fn(&self) -> ClassifyFn {
        let classifier = self.clone();
        Arc::new(move |reading| classifier.classify(reading))
    }
}

/// The default rule table.
pub fn default_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule {
            source_prefix: "probe-process:".into(),
            predicate: Arc::new(|r| r.bool_field("pid_found") == Some(false)),
            anomaly_type: AnomalyType::ProcessDead,
            severity: Severity::High,
            target: TargetSpec::FromField("name".into()),
            remediation_hint: Some("rb-restart-service".into()),
        },
        ClassifierRule {
            source_prefix: "probe-disk:".into(),
            predicate: Arc::new(|r| r.f64_field("used_pct").is_some_and(|p| p >= 95.0)),
            anomaly_type: AnomalyType::DiskFull,
            severity: Severity::High,
            target: TargetSpec::FromField("mount".into()),
            remediation_hint: Some("rb-disk-cleanup".into()),
        },
        ClassifierRule {
            source_prefix: "probe-memory".into(),
            predicate: Arc::new(|r| {
                r.f64_field("used_pct").is_some_and(|p| (90.0..97.0).contains(&p))
            }),
            anomaly_type: AnomalyType::MemoryPressure,
            severity: Severity::Medium,
            target: TargetSpec::Fixed("system-memory".into()),
            remediation_hint: None,
        },
        ClassifierRule {
            source_prefix: "probe-memory".into(),
            predicate: Arc::new(|r| r.f64_field("used_pct").is_some_and(|p| p >= 97.0)),
            anomaly_type: AnomalyType::MemoryPressure,
            severity: Severity::Critical,
            target: TargetSpec::Fixed("system-memory".into()),
            remediation_hint: None,
        },
        ClassifierRule {
            source_prefix: "probe-gateway:".into(),
            predicate: Arc::new(|r| {
                r.bool_field("reachable") == Some(false)
                    && r.f64_field("consecutive_failures").is_some_and(|n| n >= 3.0)
            }),
            anomaly_type: AnomalyType::GatewayUnreachable,
            severity: Severity::High,
            target: TargetSpec::SourceSuffix,
            remediation_hint: Some("rb-gateway-restart".into()),
        },
        ClassifierRule {
            source_prefix: "probe-gateway:".into(),
            predicate: Arc::new(|r| {
                r.bool_field("reachable") == Some(true)
                    && r.f64_field("latency_ms").is_some_and(|l| l > 5_000.0)
            }),
            anomaly_type: AnomalyType::GatewayDegraded,
            severity: Severity::Low,
            target: TargetSpec::SourceSuffix,
            remediation_hint: None,
        },
    ]
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
