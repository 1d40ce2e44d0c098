//! Scenario: a user correction binds to the recent tool call and flows
//! through the learning pipeline.

use crate::prelude::*;
use medulla_core::{FailureType, LearningConfig, PropagationStatus, Tier};
use medulla_learning::{
    detection_queue, CorrectionScanner, FailureClassifier, LearningPipeline, RegressionGenerator,
    SopPatcher, ToolMonitor,
};
use medulla_storage::{FailureRepo, MemoryRepo, MetricsSink};
use medulla_synapse::{FakeChannel, Synapse};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn correction_binds_to_tool_call_and_propagates() {
    let store = store();
    let clock = clock();
    let (queue, mut rx) = detection_queue(16);

    let monitor = ToolMonitor::new(queue.clone());
    let scanner = CorrectionScanner::new(
        queue,
        LearningConfig::default().correction_keywords,
        120_000,
        clock.clone(),
    );

    // t=0: the exec tool fails
    monitor.on_tool_result("exec", 2, "No such file or directory", Some("ls /nonexistent"));
    scanner.note_tool_call("exec", Some("ls /nonexistent"));

    // t=10s: the user corrects
    clock.advance(Duration::from_secs(10));
    let matched = scanner.on_user_message("wrong path, should be /actual");
    assert_eq!(matched.as_deref(), Some("wrong path"));

    // the tool error payload arrived first
    let tool_error = rx.recv().await.unwrap();
    assert_eq!(tool_error.failure_type, FailureType::ToolErr);

    // the correction payload carries the binding
    let correction = rx.recv().await.unwrap();
    assert_eq!(correction.failure_type, FailureType::Correct);
    assert_eq!(correction.tier, Tier::T2);
    assert_eq!(correction.context["tool_name"], "exec");
    assert_eq!(correction.context["matched_keyword"], "wrong path");
    assert_eq!(correction.raw_input.as_deref(), Some("ls /nonexistent"));

    // drive the correction through the pipeline
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
        Synapse::new(Arc::new(channel), idgen("msg"), clock.clone()),
        MetricsSink::open_in_memory().unwrap(),
        FailureClassifier::default(),
        LearningConfig::default(),
        idgen("f"),
        clock,
    );

    let event = pipeline.process(correction).await.unwrap();
    assert_eq!(event.root_cause, "bad_path");
    assert_eq!(event.propagation_status, PropagationStatus::Propagated);

    // sop patch, atom, regression stub all landed
    let records = pipeline.failures().propagations_for(&event.id).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.completed_at.is_some()));
}
