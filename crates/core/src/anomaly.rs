// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anomaly and probe-reading value objects.
//!
//! Anomalies are transient: the classifier emits them and the incident
//! manager decides whether one becomes a persisted [`crate::Incident`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of anomaly types the classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// A supervised process is no longer running.
    ProcessDead,
    /// A supervised process restarted repeatedly within its window.
    ProcessFlapping,
    /// System memory usage above the configured watermark.
    MemoryPressure,
    /// A monitored filesystem is above its usage watermark.
    DiskFull,
    /// Disk I/O errors or read-only remount detected.
    DiskDegraded,
    /// The external message gateway did not answer its health check.
    GatewayUnreachable,
    /// The gateway answers but latency is above threshold.
    GatewayDegraded,
    /// The relational store failed its integrity check.
    StoreCorruption,
    /// The relational store reported a persistent lock.
    StoreLocked,
    /// A probe reading is older than its freshness threshold.
    ProbeStale,
    /// A work queue depth exceeded its bound.
    QueueBacklog,
    /// System clock drift beyond tolerance.
    ClockSkew,
    /// On-disk configuration no longer matches the loaded configuration.
    ConfigDrift,
}

impl AnomalyType {
    /// Stable string form used in storage keys and bus subjects.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::ProcessDead => "process_dead",
            AnomalyType::ProcessFlapping => "process_flapping",
            AnomalyType::MemoryPressure => "memory_pressure",
            AnomalyType::DiskFull => "disk_full",
            AnomalyType::DiskDegraded => "disk_degraded",
            AnomalyType::GatewayUnreachable => "gateway_unreachable",
            AnomalyType::GatewayDegraded => "gateway_degraded",
            AnomalyType::StoreCorruption => "store_corruption",
            AnomalyType::StoreLocked => "store_locked",
            AnomalyType::ProbeStale => "probe_stale",
            AnomalyType::QueueBacklog => "queue_backlog",
            AnomalyType::ClockSkew => "clock_skew",
            AnomalyType::ConfigDrift => "config_drift",
        }
    }

    /// Parse the stable string form back into a type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "process_dead" => Some(AnomalyType::ProcessDead),
            "process_flapping" => Some(AnomalyType::ProcessFlapping),
            "memory_pressure" => Some(AnomalyType::MemoryPressure),
            "disk_full" => Some(AnomalyType::DiskFull),
            "disk_degraded" => Some(AnomalyType::DiskDegraded),
            "gateway_unreachable" => Some(AnomalyType::GatewayUnreachable),
            "gateway_degraded" => Some(AnomalyType::GatewayDegraded),
            "store_corruption" => Some(AnomalyType::StoreCorruption),
            "store_locked" => Some(AnomalyType::StoreLocked),
            "probe_stale" => Some(AnomalyType::ProbeStale),
            "queue_backlog" => Some(AnomalyType::QueueBacklog),
            "clock_skew" => Some(AnomalyType::ClockSkew),
            "config_drift" => Some(AnomalyType::ConfigDrift),
            _ => None,
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anomaly severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One timestamped observation from a polled data source.
///
/// Probes never fail: an unavailable source is reported as
/// `available: false` with the error text carried alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub source_id: String,
    /// Epoch milliseconds when the reading was captured.
    pub captured_at: u64,
    /// Age of the underlying data at capture time.
    pub freshness_ms: u64,
    /// Source-specific key/value payload.
    pub data: serde_json::Value,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reading {
    /// A healthy reading with the given payload.
    pub fn available(source_id: impl Into<String>, captured_at: u64, data: serde_json::Value) -> Self {
        Self {
            source_id: source_id.into(),
            captured_at,
            freshness_ms: 0,
            data,
            available: true,
            error: None,
        }
    }

    /// A reading for a source that could not be polled.
    pub fn unavailable(source_id: impl Into<String>, captured_at: u64, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            captured_at,
            freshness_ms: 0,
            data: serde_json::Value::Null,
            available: false,
            error: Some(error.into()),
        }
    }

    /// Fetch a boolean field from the payload.
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Fetch a numeric field from the payload.
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| v.as_f64())
    }

    /// Fetch a string field from the payload.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

/// A typed deviation detected in a single reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: String,
    pub anomaly_type: AnomalyType,
    /// What the anomaly is about (process name, mount point, ...).
    pub target_id: String,
    pub severity: Severity,
    /// Epoch milliseconds at detection.
    pub detected_at: u64,
    /// Probe that produced the triggering reading.
    pub source_id: String,
    /// Opaque detail payload copied from the reading.
    pub details: serde_json::Value,
    /// Runbook id suggestion, if a rule names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_hint: Option<String>,
}

impl Anomaly {
    /// The `(anomaly_type, target_id)` incident key.
    pub fn key(&self) -> (AnomalyType, &str) {
        (self.anomaly_type, &self.target_id)
    }
}

#[cfg(test)]
#[path = "anomaly_tests.rs"]
mod tests;
