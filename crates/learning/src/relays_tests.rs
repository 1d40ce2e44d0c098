// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::queue::detection_queue;
use medulla_core::FakeClock;
use std::time::Duration;

#[tokio::test]
async fn tool_monitor_ignores_success() {
    let (queue, mut rx) = detection_queue(8);
    let monitor = ToolMonitor::new(queue);

    monitor.on_tool_result("exec", 0, "", Some("ls /"));
    monitor.on_tool_result("exec", 2, "No such file or directory", Some("ls /nonexistent"));

    let payload = rx.recv().await.unwrap();
    assert_eq!(payload.failure_type, FailureType::ToolErr);
    assert_eq!(payload.tier, Tier::T1);
    assert_eq!(payload.context["tool_name"], "exec");
    assert!(payload.failure_desc.contains("exited 2"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn tool_monitor_catches_exceptions() {
    let (queue, mut rx) = detection_queue(8);
    let monitor = ToolMonitor::new(queue);
    monitor.on_tool_exception("fetch", "connection reset by peer", None);
    let payload = rx.recv().await.unwrap();
    assert!(payload.failure_desc.contains("raised"));
}

#[test]
fn strip_markup_removes_fences_and_quotes() {
    let text = "wrong path\n```\nwrong fenced content\n```\n> quoted wrong line\nplain tail";
    let stripped = strip_markup(text);
    assert!(stripped.contains("wrong path"));
    assert!(stripped.contains("plain tail"));
    assert!(!stripped.contains("fenced content"));
    assert!(!stripped.contains("quoted"));
}

fn scanner(
    window_ms: u64,
) -> (
    CorrectionScanner<FakeClock>,
    tokio::sync::mpsc::Receiver<medulla_core::DetectionPayload>,
    FakeClock,
) {
    let (queue, rx) = detection_queue(8);
    let clock = FakeClock::new();
    let scanner = CorrectionScanner::new(
        queue,
        vec!["wrong path".into(), "should be".into()],
        window_ms,
        clock.clone(),
    );
    (scanner, rx, clock)
}

#[tokio::test]
async fn correction_binds_to_recent_tool_call() {
    let (scanner, mut rx, clock) = scanner(120_000);
    scanner.note_tool_call("exec", Some("ls /nonexistent"));

    clock.advance(Duration::from_secs(10));
    let matched = scanner.on_user_message("wrong path, should be /actual");
    assert_eq!(matched.as_deref(), Some("wrong path"));

    let payload = rx.recv().await.unwrap();
    assert_eq!(payload.failure_type, FailureType::Correct);
    assert_eq!(payload.tier, Tier::T2);
    assert_eq!(payload.context["tool_name"], "exec");
    assert_eq!(payload.context["matched_keyword"], "wrong path");
    assert_eq!(payload.raw_input.as_deref(), Some("ls /nonexistent"));
}

#[tokio::test]
async fn correction_outside_window_is_dropped() {
    let (scanner, mut rx, clock) = scanner(30_000);
    scanner.note_tool_call("exec", None);
    clock.advance(Duration::from_secs(31));
    assert!(scanner.on_user_message("wrong path").is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn keyword_inside_code_block_does_not_fire() {
    let (scanner, mut rx, _clock) = scanner(120_000);
    scanner.note_tool_call("exec", None);
    let matched = scanner.on_user_message("```\nwrong path\n```\nlooks fine otherwise");
    assert!(matched.is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn most_recent_call_in_window_wins() {
    let (scanner, mut rx, clock) = scanner(120_000);
    scanner.note_tool_call("older", None);
    clock.advance(Duration::from_secs(5));
    scanner.note_tool_call("newer", None);
    clock.advance(Duration::from_secs(5));

    scanner.on_user_message("should be the other file");
    let payload = rx.recv().await.unwrap();
    assert_eq!(payload.context["tool_name"], "newer");
}

#[tokio::test]
async fn reset_clears_the_window() {
    let (scanner, mut rx, _clock) = scanner(120_000);
    scanner.note_tool_call("exec", None);
    scanner.reset();
    assert!(scanner.on_user_message("wrong path").is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn hook_trust_and_pipeline_relays_set_their_tiers() {
    let (queue, mut rx) = detection_queue(8);

    HookViolationRelay::new(queue.clone()).on_violation("pre-commit", "no-force-push", "git push -f");
    TrustEventRelay::new(queue.clone()).on_demotion("augur", 1, 2, "missed check-in");
    PipelineFailRelay::new(queue).on_stage_failed("ingest", "extract", "schema drift");

    let sop = rx.recv().await.unwrap();
    assert_eq!(sop.failure_type, FailureType::SopViol);
    assert_eq!(sop.tier, Tier::T2);

    let trust = rx.recv().await.unwrap();
    assert_eq!(trust.failure_type, FailureType::TrustDem);
    assert_eq!(trust.tier, Tier::T3);

    let pipe = rx.recv().await.unwrap();
    assert_eq!(pipe.failure_type, FailureType::PipeFail);
    assert_eq!(pipe.tier, Tier::T3);
}
