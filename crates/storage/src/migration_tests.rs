// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Store;

#[test]
fn migrations_apply_on_fresh_store() {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();

    // spot-check a few tables exist
    for table in ["incidents", "failure_events", "stm", "atoms", "sessions"] {
        let found: Option<String> = store
            .get(
                "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                &[&table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(found.as_deref(), Some(table), "missing table {table}");
    }
}

#[test]
fn migrations_are_idempotent() {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();
    // Second run hits the ADD COLUMN steps again; duplicate column errors
    // must be tolerated.
    run_migrations(&store).unwrap();
    run_migrations(&store).unwrap();
}

#[test]
fn stm_gains_additive_columns() {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();
    store
        .run(
            "INSERT INTO stm (id, importance, timestamp, body, archived_by, compressed_from)
             VALUES ('m1', 1.0, 0, '{}', NULL, NULL)",
            &[],
        )
        .unwrap();
}

#[test]
fn open_incident_uniqueness_is_partial() {
    let store = Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();

    let insert = "INSERT INTO incidents (id, anomaly_type, target_id, state, detected_at, body)
                  VALUES (?1, ?2, ?3, ?4, 0, '{}')";
    store
        .run(insert, &[&"i1", &"process_dead", &"svc", &"resolved"])
        .unwrap();
    // terminal rows do not block a new open incident for the same key
    store
        .run(insert, &[&"i2", &"process_dead", &"svc", &"detected"])
        .unwrap();
    // but a second open row for the key violates the partial index
    let err = store.run(insert, &[&"i3", &"process_dead", &"svc", &"remediating"]);
    assert!(err.is_err());
}
