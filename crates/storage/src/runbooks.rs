// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted runbook metadata: dry-run counters, confidence, mode.

use crate::store::{Store, StoreError};
use medulla_core::{RunbookMeta, RunbookMode};

/// Repository over the `runbook_meta` table.
#[derive(Clone)]
pub struct RunbookMetaRepo {
    store: Store,
}

impl RunbookMetaRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Load metadata, creating a fresh dry-run row on first sight.
    pub fn load_or_init(&self, runbook_id: &str) -> Result<RunbookMeta, StoreError> {
        if let Some(meta) = self.get(runbook_id)? {
            return Ok(meta);
        }
        let meta = RunbookMeta::fresh(runbook_id);
        self.save(&meta)?;
        Ok(meta)
    }

    pub fn get(&self, runbook_id: &str) -> Result<Option<RunbookMeta>, StoreError> {
        let body: Option<String> = self.store.get(
            "SELECT body FROM runbook_meta WHERE runbook_id = ?1",
            &[&runbook_id],
            |row| row.get(0),
        )?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    pub fn save(&self, meta: &RunbookMeta) -> Result<(), StoreError> {
        let body = serde_json::to_string(meta)?;
        self.store.run(
            "INSERT INTO runbook_meta (runbook_id, mode, dry_run_count, body)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(runbook_id) DO UPDATE SET
               mode = excluded.mode,
               dry_run_count = excluded.dry_run_count,
               body = excluded.body",
            &[
                &meta.runbook_id,
                &meta.mode.as_str(),
                &(meta.dry_run_count as i64),
                &body,
            ],
        )?;
        Ok(())
    }

    /// Record a completed dry run and graduate if the operator allows it.
    pub fn record_dry_run(
        &self,
        runbook_id: &str,
        now_ms: u64,
        graduation_count: u32,
        whitelist: &[String],
    ) -> Result<RunbookMeta, StoreError> {
        let mut meta = self.load_or_init(runbook_id)?;
        meta.dry_run_count += 1;
        meta.last_executed_at = Some(now_ms);
        if meta.mode == RunbookMode::DryRun
            && meta.graduation_eligible(graduation_count, whitelist)
        {
            meta.mode = RunbookMode::AutoExecute;
        }
        self.save(&meta)?;
        Ok(meta)
    }

    /// Record a live execution outcome; success nudges confidence up,
    /// failure pulls it down harder.
    pub fn record_live_run(
        &self,
        runbook_id: &str,
        succeeded: bool,
        now_ms: u64,
    ) -> Result<RunbookMeta, StoreError> {
        let mut meta = self.load_or_init(runbook_id)?;
        meta.last_executed_at = Some(now_ms);
        if succeeded {
            meta.last_succeeded_at = Some(now_ms);
            meta.confidence = (meta.confidence + 0.1).min(1.0);
        } else {
            meta.confidence = (meta.confidence - 0.2).max(0.0);
        }
        self.save(&meta)?;
        Ok(meta)
    }
}

#[cfg(test)]
#[path = "runbooks_tests.rs"]
mod tests;
