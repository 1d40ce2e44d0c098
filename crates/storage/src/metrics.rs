// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only metrics sink.
//!
//! Lives in its own database file so metric writes never contend with the
//! main store. The system writes here and never reads back; dashboards do.

use crate::store::{Store, StoreError};
use std::path::Path;

const METRICS_DDL: &str = "CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    value REAL NOT NULL,
    tags TEXT NOT NULL DEFAULT '',
    recorded_at INTEGER NOT NULL
);";

/// Writer over the parallel `metrics.db`.
#[derive(Clone)]
pub struct MetricsSink {
    store: Store,
}

impl MetricsSink {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let store = Store::open(path)?;
        store.run_batch(METRICS_DDL)?;
        Ok(Self { store })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Store::open_in_memory()?;
        store.run_batch(METRICS_DDL)?;
        Ok(Self { store })
    }

    /// Append one numeric point. Tags are `key=value` pairs joined by `,`.
    pub fn write(&self, name: &str, value: f64, tags: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.store.run(
            "INSERT INTO metrics (name, value, tags, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            &[&name, &value, &tags, &now],
        )?;
        Ok(())
    }

    /// Append an occurrence event (value 1).
    pub fn event(&self, name: &str, tags: &str) -> Result<(), StoreError> {
        self.write(name, 1.0, tags)
    }

    /// Best-effort write used on paths where a metrics failure must never
    /// mask the primary outcome.
    pub fn write_or_log(&self, name: &str, value: f64, tags: &str) {
        if let Err(e) = self.write(name, value, tags) {
            tracing::warn!(metric = name, error = %e, "metric write failed");
        }
    }

    #[cfg(test)]
    pub(crate) fn count(&self, name: &str) -> i64 {
        self.store
            .get(
                "SELECT COUNT(*) FROM metrics WHERE name = ?1",
                &[&name],
                |row| row.get(0),
            )
            .ok()
            .flatten()
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
