// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use medulla_core::{FailureType, Tier};
use serde_json::json;

fn payload(desc: &str) -> DetectionPayload {
    DetectionPayload {
        failure_type: FailureType::ToolErr,
        tier: Tier::T1,
        source: "tool_monitor".into(),
        context: json!({}),
        raw_input: None,
        failure_desc: desc.into(),
    }
}

#[tokio::test]
async fn enqueue_is_nonblocking_and_ordered() {
    let (queue, mut rx) = detection_queue(8);
    assert!(queue.enqueue(payload("first")));
    assert!(queue.enqueue(payload("second")));

    assert_eq!(rx.recv().await.unwrap().failure_desc, "first");
    assert_eq!(rx.recv().await.unwrap().failure_desc, "second");
}

#[tokio::test]
async fn full_queue_drops_instead_of_blocking() {
    let (queue, _rx) = detection_queue(2);
    assert!(queue.enqueue(payload("a")));
    assert!(queue.enqueue(payload("b")));
    // bound reached; enqueue returns immediately with false
    assert!(!queue.enqueue(payload("c")));
}

#[tokio::test]
async fn closed_queue_reports_failure() {
    let (queue, rx) = detection_queue(2);
    drop(rx);
    assert!(!queue.enqueue(payload("orphan")));
}
