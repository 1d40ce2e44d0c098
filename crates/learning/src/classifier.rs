// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classifier: `(type, description pattern)` → root cause and
//! propagation targets.

use medulla_core::{DetectionPayload, FailureType, PropagationType};
use regex::Regex;

/// One classification rule. Rules are tried in order; the first whose
/// type and pattern both match wins.
pub struct FailureRule {
    /// `None` matches every failure type (the catch-all).
    pub failure_type: Option<FailureType>,
    pub pattern: Regex,
    pub root_cause: &'static str,
    pub targets: Vec<PropagationType>,
}

/// Ordered rule table with a guaranteed catch-all.
pub struct FailureClassifier {
    rules: Vec<FailureRule>,
}

impl FailureClassifier {
    pub fn new(rules: Vec<FailureRule>) -> Self {
        Self { rules }
    }

    /// Classify a detection. The catch-all guarantees a result.
    pub fn classify(&self, payload: &DetectionPayload) -> (&'static str, Vec<PropagationType>) {
        for rule in &self.rules {
            if let Some(ty) = rule.failure_type {
                if ty != payload.failure_type {
                    continue;
                }
            }
            if rule.pattern.is_match(&payload.failure_desc) {
                return (rule.root_cause, rule.targets.clone());
            }
        }
        ("unclassified", vec![PropagationType::SopPatch])
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(default_failure_rules())
    }
}

/// The default rule table.
pub fn default_failure_rules() -> Vec<FailureRule> {
    // the patterns below are static and known-good; a broken one is a
    // programming error caught by the rule-table test
    let rule = |ty: Option<FailureType>,
                pattern: &str,
                root_cause: &'static str,
                targets: Vec<PropagationType>| {
        Regex::new(pattern).ok().map(|pattern| FailureRule {
            failure_type: ty,
            pattern,
            root_cause,
            targets,
        })
    };

    [
        rule(
            Some(FailureType::ToolErr),
            r"(?i)no such file|not found|ENOENT|wrong path",
            "bad_path",
            vec![PropagationType::SopPatch, PropagationType::RegressionTest],
        ),
        rule(
            Some(FailureType::ToolErr),
            r"(?i)timed out|timeout",
            "slow_dependency",
            vec![PropagationType::SopPatch, PropagationType::Atom],
        ),
        rule(
            Some(FailureType::ToolErr),
            r"(?i)permission denied|EACCES",
            "missing_permission",
            vec![PropagationType::SopPatch, PropagationType::Atom],
        ),
        rule(
            Some(FailureType::Correct),
            r"(?i)wrong path|should be /",
            "bad_path",
            vec![
                PropagationType::SopPatch,
                PropagationType::Atom,
                PropagationType::RegressionTest,
            ],
        ),
        rule(
            Some(FailureType::Correct),
            r".*",
            "user_correction",
            vec![PropagationType::SopPatch, PropagationType::Atom],
        ),
        rule(
            Some(FailureType::SopViol),
            r".*",
            "sop_violation",
            vec![PropagationType::SopPatch, PropagationType::HookPattern],
        ),
        rule(
            Some(FailureType::TrustDem),
            r".*",
            "trust_regression",
            vec![PropagationType::SopPatch, PropagationType::SynapseRelay],
        ),
        rule(
            Some(FailureType::PipeFail),
            r".*",
            "pipeline_failure",
            vec![PropagationType::SynapseRelay, PropagationType::RegressionTest],
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
