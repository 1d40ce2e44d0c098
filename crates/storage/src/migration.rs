// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migration runner.
//!
//! A fixed ordered list of DDL steps applied on every boot. Steps are
//! idempotent; `ALTER TABLE ... ADD COLUMN` re-runs surface as duplicate
//! column errors and are tolerated by contract.

use crate::store::{Store, StoreError};

/// Ordered migration list. Append only; never reorder.
pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001-incidents",
        "CREATE TABLE IF NOT EXISTS incidents (
            id TEXT PRIMARY KEY,
            anomaly_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            state TEXT NOT NULL,
            dismiss_until INTEGER,
            detected_at INTEGER NOT NULL,
            body TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_incidents_open
            ON incidents (anomaly_type, target_id)
            WHERE state NOT IN ('resolved', 'self_resolved', 'dismissed');",
    ),
    (
        "002-runbook-meta",
        "CREATE TABLE IF NOT EXISTS runbook_meta (
            runbook_id TEXT PRIMARY KEY,
            mode TEXT NOT NULL,
            dry_run_count INTEGER NOT NULL DEFAULT 0,
            body TEXT NOT NULL
        );",
    ),
    (
        "003-failure-events",
        "CREATE TABLE IF NOT EXISTS failure_events (
            id TEXT PRIMARY KEY,
            detected_at INTEGER NOT NULL,
            failure_type TEXT NOT NULL,
            root_cause TEXT NOT NULL DEFAULT '',
            propagation_status TEXT NOT NULL DEFAULT 'pending',
            recurrence_count INTEGER NOT NULL DEFAULT 0,
            body TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_failures_root_cause
            ON failure_events (root_cause, detected_at);",
    ),
    (
        "004-propagation-records",
        "CREATE TABLE IF NOT EXISTS propagation_records (
            id TEXT PRIMARY KEY,
            failure_id TEXT NOT NULL,
            propagation_type TEXT NOT NULL,
            status TEXT NOT NULL,
            body TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_propagation_failure
            ON propagation_records (failure_id);",
    ),
    (
        "005-regression-tests",
        "CREATE TABLE IF NOT EXISTS regression_tests (
            id TEXT PRIMARY KEY,
            failure_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    ),
    (
        "006-stm",
        "CREATE TABLE IF NOT EXISTS stm (
            id TEXT PRIMARY KEY,
            importance REAL NOT NULL,
            timestamp INTEGER NOT NULL,
            body TEXT NOT NULL
        );",
    ),
    // Additive columns; duplicate-column errors on re-run are tolerated.
    (
        "007-stm-archived-by",
        "ALTER TABLE stm ADD COLUMN archived_by TEXT;",
    ),
    (
        "008-stm-compressed-from",
        "ALTER TABLE stm ADD COLUMN compressed_from TEXT;",
    ),
    (
        "009-atoms",
        "CREATE TABLE IF NOT EXISTS atoms (
            id TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            body TEXT NOT NULL
        );",
    ),
    (
        "010-compression-log",
        "CREATE TABLE IF NOT EXISTS compression_log (
            run_id TEXT NOT NULL,
            cluster_fingerprint TEXT NOT NULL,
            compressed_id TEXT,
            ratio REAL,
            created_at INTEGER NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (run_id, cluster_fingerprint)
        );",
    ),
    (
        "011-sessions",
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            start_time INTEGER NOT NULL,
            end_time INTEGER,
            channel TEXT NOT NULL,
            body TEXT NOT NULL
        );",
    ),
];

/// Apply every migration in order.
pub fn run_migrations(store: &Store) -> Result<(), StoreError> {
    for (name, sql) in MIGRATIONS {
        match store.run_batch(sql) {
            Ok(()) => {
                tracing::debug!(migration = name, "applied");
            }
            Err(StoreError::Sql(e)) if is_duplicate_column(&e) => {
                tracing::debug!(migration = name, "skipped (column exists)");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn is_duplicate_column(e: &rusqlite::Error) -> bool {
    e.to_string().contains("duplicate column name")
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
