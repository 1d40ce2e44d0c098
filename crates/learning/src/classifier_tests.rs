// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use medulla_core::Tier;
use serde_json::json;
use yare::parameterized;

fn payload(ty: FailureType, desc: &str) -> DetectionPayload {
    DetectionPayload {
        failure_type: ty,
        tier: Tier::T1,
        source: "test".into(),
        context: json!({}),
        raw_input: None,
        failure_desc: desc.into(),
    }
}

#[test]
fn default_rule_table_compiles_fully() {
    // every pattern must survive Regex::new; flatten() would silently
    // drop a broken one, so count them
    assert_eq!(default_failure_rules().len(), 8);
}

#[parameterized(
    enoent = { FailureType::ToolErr, "ls: /nonexistent: No such file or directory", "bad_path" },
    timeout = { FailureType::ToolErr, "curl: operation timed out", "slow_dependency" },
    perms = { FailureType::ToolErr, "open: Permission denied", "missing_permission" },
    correction_path = { FailureType::Correct, "wrong path, should be /actual", "bad_path" },
    correction_other = { FailureType::Correct, "no, use the staging key", "user_correction" },
    sop = { FailureType::SopViol, "committed without review", "sop_violation" },
    trust = { FailureType::TrustDem, "demoted to tier 2", "trust_regression" },
    pipe = { FailureType::PipeFail, "stage extract crashed", "pipeline_failure" },
)]
fn rule_table_routes(ty: FailureType, desc: &str, expect: &str) {
    let classifier = FailureClassifier::default();
    let (root_cause, targets) = classifier.classify(&payload(ty, desc));
    assert_eq!(root_cause, expect);
    assert!(!targets.is_empty());
}

#[test]
fn unmatched_tool_error_hits_the_catch_all() {
    let classifier = FailureClassifier::default();
    let (root_cause, targets) = classifier.classify(&payload(
        FailureType::ToolErr,
        "segmentation fault (core dumped)",
    ));
    assert_eq!(root_cause, "unclassified");
    assert_eq!(targets, vec![PropagationType::SopPatch]);
}

#[test]
fn correction_about_paths_arms_a_regression_test() {
    let classifier = FailureClassifier::default();
    let (_, targets) = classifier.classify(&payload(
        FailureType::Correct,
        "wrong path, should be /actual",
    ));
    assert!(targets.contains(&PropagationType::RegressionTest));
    assert!(targets.contains(&PropagationType::Atom));
}

#[test]
fn type_gate_is_respected() {
    // the same text under a different type routes by its type rules
    let classifier = FailureClassifier::default();
    let (root_cause, _) =
        classifier.classify(&payload(FailureType::PipeFail, "wrong path, should be /actual"));
    assert_eq!(root_cause, "pipeline_failure");
}
