// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-term memory, atom, and compression-log rows.

use crate::store::{Store, StoreError};
use medulla_core::{Atom, MemoryRecord};

/// Repository over `stm`, `atoms`, and `compression_log`.
#[derive(Clone)]
pub struct MemoryRepo {
    store: Store,
}

impl MemoryRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn insert(&self, memory: &MemoryRecord) -> Result<(), StoreError> {
        let body = serde_json::to_string(memory)?;
        let compressed_from = memory
            .compressed_from
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.store.run(
            "INSERT INTO stm (id, importance, timestamp, body, archived_by, compressed_from)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &[
                &memory.id,
                &memory.importance,
                &(memory.timestamp as i64),
                &body,
                &memory.archived_by,
                &compressed_from,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<MemoryRecord>, StoreError> {
        let body: Option<String> = self.store.get(
            "SELECT body FROM stm WHERE id = ?1",
            &[&id],
            |row| row.get(0),
        )?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// Unarchived memories older than `cutoff_ms`, oldest first.
    pub fn compressible_before(&self, cutoff_ms: u64) -> Result<Vec<MemoryRecord>, StoreError> {
        let bodies: Vec<String> = self.store.all(
            "SELECT body FROM stm
             WHERE timestamp < ?1 AND archived_by IS NULL AND compressed_from IS NULL
             ORDER BY timestamp ASC",
            &[&(cutoff_ms as i64)],
            |row| row.get(0),
        )?;
        bodies
            .into_iter()
            .map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .collect()
    }

    /// Downgrade a source member after archival. Returns the importance the
    /// row had before the downgrade, for compensating rollback.
    pub fn archive_member(
        &self,
        id: &str,
        run_id: &str,
        new_importance: f64,
    ) -> Result<f64, StoreError> {
        let mut memory = self
            .get(id)?
            .ok_or_else(|| StoreError::Conflict(format!("memory {id} vanished during archive")))?;
        let original = memory.importance;
        memory.importance = new_importance;
        memory.archived_by = Some(run_id.to_string());
        self.rewrite(&memory)?;
        Ok(original)
    }

    /// Compensating write: restore a member to its captured importance and
    /// clear the archive marker.
    pub fn restore_member(&self, id: &str, original_importance: f64) -> Result<(), StoreError> {
        let mut memory = self
            .get(id)?
            .ok_or_else(|| StoreError::Conflict(format!("memory {id} vanished during restore")))?;
        memory.importance = original_importance;
        memory.archived_by = None;
        self.rewrite(&memory)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.run("DELETE FROM stm WHERE id = ?1", &[&id])?;
        Ok(())
    }

    fn rewrite(&self, memory: &MemoryRecord) -> Result<(), StoreError> {
        let body = serde_json::to_string(memory)?;
        let compressed_from = memory
            .compressed_from
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let n = self.store.run(
            "UPDATE stm
             SET importance = ?2, body = ?3, archived_by = ?4, compressed_from = ?5
             WHERE id = ?1",
            &[
                &memory.id,
                &memory.importance,
                &body,
                &memory.archived_by,
                &compressed_from,
            ],
        )?;
        if n == 0 {
            return Err(StoreError::Conflict(format!(
                "memory {} vanished during update",
                memory.id
            )));
        }
        Ok(())
    }

    // --- atoms ---

    pub fn insert_atom(&self, atom: &Atom) -> Result<(), StoreError> {
        let body = serde_json::to_string(atom)?;
        self.store.run(
            "INSERT INTO atoms (id, subject, created_at, body) VALUES (?1, ?2, ?3, ?4)",
            &[&atom.id, &atom.subject, &(atom.created_at as i64), &body],
        )?;
        Ok(())
    }

    pub fn atoms(&self) -> Result<Vec<Atom>, StoreError> {
        let bodies: Vec<String> = self.store.all(
            "SELECT body FROM atoms ORDER BY created_at ASC",
            &[],
            |row| row.get(0),
        )?;
        bodies
            .into_iter()
            .map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .collect()
    }

    /// Whether the atoms table is present (the learning fan-out checks
    /// before writing).
    pub fn atoms_table_exists(&self) -> Result<bool, StoreError> {
        let found: Option<String> = self.store.get(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='atoms'",
            &[],
            |row| row.get(0),
        )?;
        Ok(found.is_some())
    }

    // --- compression log ---

    pub fn log_compression(
        &self,
        run_id: &str,
        fingerprint: &str,
        compressed_id: Option<&str>,
        ratio: Option<f64>,
        created_at: u64,
        body: &serde_json::Value,
    ) -> Result<(), StoreError> {
        self.store.run(
            "INSERT OR REPLACE INTO compression_log
             (run_id, cluster_fingerprint, compressed_id, ratio, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &[
                &run_id,
                &fingerprint,
                &compressed_id,
                &ratio,
                &(created_at as i64),
                &body.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Whether a cluster fingerprint was already compressed by any run.
    pub fn fingerprint_seen(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let found: Option<String> = self.store.get(
            "SELECT run_id FROM compression_log
             WHERE cluster_fingerprint = ?1 AND compressed_id IS NOT NULL",
            &[&fingerprint],
            |row| row.get(0),
        )?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
#[path = "memories_tests.rs"]
mod tests;
