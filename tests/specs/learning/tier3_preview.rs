//! Scenario: tier-3 SOP patches are previewed for approval, never
//! auto-committed.

use crate::prelude::*;
use medulla_core::{DetectionPayload, FailureType, LearningConfig, PropagationType, Tier};
use medulla_learning::{
    FailureClassifier, LearningPipeline, RegressionGenerator, SopPatcher,
};
use medulla_storage::{FailureRepo, MemoryRepo, MetricsSink};
use medulla_synapse::{FakeChannel, Priority, Synapse};
use std::sync::Arc;

#[tokio::test]
async fn tier3_patch_previews_instead_of_committing() {
    let store = store();
    let clock = clock();
    let sop_dir = tempfile::tempdir().unwrap();
    let repo_dir = tempfile::tempdir().unwrap();
    let channel = FakeChannel::new();

    let pipeline = LearningPipeline::new(
        FailureRepo::new(store.clone()),
        MemoryRepo::new(store.clone()),
        SopPatcher::new(sop_dir.path().join("sop"), clock.clone()),
        RegressionGenerator::new(
            repo_dir.path().to_path_buf(),
            FailureRepo::new(store),
            clock.clone(),
        ),
        Synapse::new(Arc::new(channel.clone()), idgen("msg"), clock.clone()),
        MetricsSink::open_in_memory().unwrap(),
        FailureClassifier::default(),
        LearningConfig::default(),
        idgen("f"),
        clock,
    );

    let event = pipeline
        .process(DetectionPayload {
            failure_type: FailureType::TrustDem,
            tier: Tier::T3,
            source: "trust_relay".into(),
            context: serde_json::json!({"subject": "augur"}),
            raw_input: None,
            failure_desc: "augur demoted 1→2: missed check-in".into(),
        })
        .await
        .unwrap();

    assert_eq!(event.root_cause, "trust_regression");

    // the patch landed in trust-boundaries.md, uncommitted
    let records = pipeline.failures().propagations_for(&event.id).unwrap();
    let sop = records
        .iter()
        .find(|r| r.propagation_type == PropagationType::SopPatch)
        .unwrap();
    assert_eq!(sop.status, "preview");
    assert!(sop.commit_sha.is_none());
    assert!(sop
        .target_file
        .as_deref()
        .unwrap()
        .ends_with("trust-boundaries.md"));
    let file = std::fs::read_to_string(sop.target_file.as_deref().unwrap()).unwrap();
    assert!(file.contains("trust_regression"));

    // the preview reached the operator at action priority on the
    // failure's thread, with the diff and the approve instruction
    let preview = channel
        .delivered()
        .into_iter()
        .find(|m| m.subject == "rtl.sop_preview")
        .unwrap();
    assert_eq!(preview.priority, Priority::Action);
    assert_eq!(
        preview.thread_id.as_deref(),
        Some(format!("rtl:{}", event.id).as_str())
    );
    assert!(preview.body.contains("trust-boundaries.md"));
    assert!(preview.body.contains("approve"));
}
