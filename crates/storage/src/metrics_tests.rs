// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn writes_accumulate_append_only() {
    let sink = MetricsSink::open_in_memory().unwrap();
    sink.write("heal_escalation_fired", 1.0, "tier=0,outcome=fired")
        .unwrap();
    sink.event("heal_escalation_fired", "tier=0,outcome=fired")
        .unwrap();
    assert_eq!(sink.count("heal_escalation_fired"), 2);
}

#[test]
fn separate_names_are_independent() {
    let sink = MetricsSink::open_in_memory().unwrap();
    sink.event("rtl_processing_ms", "").unwrap();
    assert_eq!(sink.count("rtl_processing_ms"), 1);
    assert_eq!(sink.count("other"), 0);
}

#[test]
fn open_creates_file_backed_sink() {
    let dir = tempfile::tempdir().unwrap();
    let sink = MetricsSink::open(&dir.path().join("metrics.db")).unwrap();
    sink.event("boot", "").unwrap();
    assert_eq!(sink.count("boot"), 1);
}
