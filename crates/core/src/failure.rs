// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time learning records: detections, failure events, propagations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure detection categories fed into the learning queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureType {
    /// A tool invocation exited nonzero or raised.
    #[serde(rename = "TOOL_ERR")]
    ToolErr,
    /// The user corrected a recent tool call.
    #[serde(rename = "CORRECT")]
    Correct,
    /// A pre-action SOP hook reported a violation.
    #[serde(rename = "SOP_VIOL")]
    SopViol,
    /// A trust tier demotion was observed.
    #[serde(rename = "TRUST_DEM")]
    TrustDem,
    /// A pipeline stage failed.
    #[serde(rename = "PIPE_FAIL")]
    PipeFail,
}

impl FailureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::ToolErr => "TOOL_ERR",
            FailureType::Correct => "CORRECT",
            FailureType::SopViol => "SOP_VIOL",
            FailureType::TrustDem => "TRUST_DEM",
            FailureType::PipeFail => "PIPE_FAIL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TOOL_ERR" => Some(FailureType::ToolErr),
            "CORRECT" => Some(FailureType::Correct),
            "SOP_VIOL" => Some(FailureType::SopViol),
            "TRUST_DEM" => Some(FailureType::TrustDem),
            "PIPE_FAIL" => Some(FailureType::PipeFail),
            _ => None,
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detection tier: 1 is routine, 3 touches trust boundaries.
///
/// Tier 3 propagations are never auto-committed; the operator approves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tier(pub u8);

impl Tier {
    pub const T1: Tier = Tier(1);
    pub const T2: Tier = Tier(2);
    pub const T3: Tier = Tier(3);

    /// Clamp arbitrary input into the valid 1..=3 range.
    pub fn clamped(raw: u8) -> Self {
        Tier(raw.clamp(1, 3))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Forward-only propagation lifecycle of a failure event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStatus {
    Pending,
    InProgress,
    Propagated,
    Escalated,
    NoFixNeeded,
}

impl PropagationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationStatus::Pending => "pending",
            PropagationStatus::InProgress => "in_progress",
            PropagationStatus::Propagated => "propagated",
            PropagationStatus::Escalated => "escalated",
            PropagationStatus::NoFixNeeded => "no_fix_needed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PropagationStatus::Pending),
            "in_progress" => Some(PropagationStatus::InProgress),
            "propagated" => Some(PropagationStatus::Propagated),
            "escalated" => Some(PropagationStatus::Escalated),
            "no_fix_needed" => Some(PropagationStatus::NoFixNeeded),
            _ => None,
        }
    }

    /// Position along the enumerated order; transitions may only increase.
    pub fn rank(&self) -> u8 {
        match self {
            PropagationStatus::Pending => 0,
            PropagationStatus::InProgress => 1,
            PropagationStatus::Propagated => 2,
            PropagationStatus::Escalated => 3,
            PropagationStatus::NoFixNeeded => 4,
        }
    }

    /// Whether moving to `next` respects the forward-only contract.
    pub fn can_advance_to(&self, next: PropagationStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for PropagationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload enqueued by the detection relays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionPayload {
    pub failure_type: FailureType,
    pub tier: Tier,
    /// Relay that produced the detection ("tool_monitor", "hook_relay", ...).
    pub source: String,
    /// Structured context: tool name, matched keyword, file paths, ...
    pub context: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<String>,
    pub failure_desc: String,
}

/// A persisted failure event, kept indefinitely for recurrence analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEvent {
    pub id: String,
    pub detected_at: u64,
    pub failure_type: FailureType,
    pub tier: Tier,
    pub source: String,
    pub context: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<String>,
    pub failure_desc: String,
    pub root_cause: String,
    pub propagation_status: PropagationStatus,
    pub recurrence_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_recurred_at: Option<u64>,
}

/// Kinds of persistent side effect a failure can fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationType {
    SopPatch,
    HookPattern,
    Atom,
    RegressionTest,
    SynapseRelay,
    CrossSystem,
}

impl PropagationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationType::SopPatch => "sop_patch",
            PropagationType::HookPattern => "hook_pattern",
            PropagationType::Atom => "atom",
            PropagationType::RegressionTest => "regression_test",
            PropagationType::SynapseRelay => "synapse_relay",
            PropagationType::CrossSystem => "cross_system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sop_patch" => Some(PropagationType::SopPatch),
            "hook_pattern" => Some(PropagationType::HookPattern),
            "atom" => Some(PropagationType::Atom),
            "regression_test" => Some(PropagationType::RegressionTest),
            "synapse_relay" => Some(PropagationType::SynapseRelay),
            "cross_system" => Some(PropagationType::CrossSystem),
            _ => None,
        }
    }
}

impl fmt::Display for PropagationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row per `(failure, target)` propagation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationRecord {
    pub id: String,
    pub failure_id: String,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    pub propagation_type: PropagationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synapse_msg_id: Option<String>,
    /// "committed", "preview", "failed", "skipped".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
