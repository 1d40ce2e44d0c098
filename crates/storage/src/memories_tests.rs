// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{run_migrations, Store};
use serde_json::json;

fn repo() -> MemoryRepo {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();
    MemoryRepo::new(store)
}

fn memory(id: &str, importance: f64, timestamp: u64) -> MemoryRecord {
    MemoryRecord {
        id: id.into(),
        content: format!("memory body for {id}"),
        categories: vec!["trading".into(), "signals".into()],
        importance,
        timestamp,
        compressed_from: None,
        archived_by: None,
    }
}

#[test]
fn insert_and_get_round_trip() {
    let repo = repo();
    repo.insert(&memory("m1", 1.5, 1_000)).unwrap();
    let loaded = repo.get("m1").unwrap().unwrap();
    assert_eq!(loaded.importance, 1.5);
    assert_eq!(loaded.categories, vec!["trading", "signals"]);
}

#[test]
fn compressible_excludes_young_and_archived_rows() {
    let repo = repo();
    repo.insert(&memory("m-old", 1.0, 1_000)).unwrap();
    repo.insert(&memory("m-young", 1.0, 90_000)).unwrap();
    let mut archived = memory("m-archived", 1.0, 2_000);
    archived.archived_by = Some("run-0".into());
    repo.insert(&archived).unwrap();
    let mut compressed = memory("m-compressed", 2.0, 3_000);
    compressed.compressed_from = Some(vec!["a".into(), "b".into()]);
    repo.insert(&compressed).unwrap();

    let eligible = repo.compressible_before(50_000).unwrap();
    let ids: Vec<&str> = eligible.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m-old"]);
}

#[test]
fn archive_returns_original_and_restore_reverts() {
    let repo = repo();
    repo.insert(&memory("m1", 1.8, 1_000)).unwrap();

    let original = repo.archive_member("m1", "run-7", 0.5).unwrap();
    assert_eq!(original, 1.8);
    let archived = repo.get("m1").unwrap().unwrap();
    assert_eq!(archived.importance, 0.5);
    assert_eq!(archived.archived_by.as_deref(), Some("run-7"));

    repo.restore_member("m1", original).unwrap();
    let restored = repo.get("m1").unwrap().unwrap();
    assert_eq!(restored.importance, 1.8);
    assert!(restored.archived_by.is_none());
}

#[test]
fn archive_of_missing_member_is_a_conflict() {
    let repo = repo();
    let err = repo.archive_member("ghost", "run-1", 0.5).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[test]
fn atoms_round_trip_and_table_probe() {
    let repo = repo();
    assert!(repo.atoms_table_exists().unwrap());

    let atom = Atom {
        id: "at-1".into(),
        subject: "failure:TOOL_ERR:abc123".into(),
        action: "triggered by bad_path in tool_monitor".into(),
        outcome: "propagated to sop_patch, regression_test".into(),
        consequences: "regression armed".into(),
        confidence: 0.8,
        source: "learning".into(),
        created_at: 1_000,
        categories: vec![],
    };
    repo.insert_atom(&atom).unwrap();
    let atoms = repo.atoms().unwrap();
    assert_eq!(atoms.len(), 1);
    assert_eq!(atoms[0].subject, "failure:TOOL_ERR:abc123");
}

#[test]
fn compression_log_tracks_fingerprints() {
    let repo = repo();
    assert!(!repo.fingerprint_seen("fp-1").unwrap());

    repo.log_compression("run-1", "fp-1", Some("m-comp"), Some(4.2), 1_000, &json!({}))
        .unwrap();
    assert!(repo.fingerprint_seen("fp-1").unwrap());

    // refused clusters (no compressed row) do not count as seen
    repo.log_compression("run-1", "fp-2", None, None, 1_000, &json!({"refused": true}))
        .unwrap();
    assert!(!repo.fingerprint_seen("fp-2").unwrap());
}
