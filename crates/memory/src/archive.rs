// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compressed-row writer and source archiver.
//!
//! The one place in the system with a transaction-like contract: either
//! the compressed row exists and every source member is downgraded, or
//! neither. Rollback restores each member's captured original importance
//! (not a fixed constant) and deletes the compressed row.

use crate::distill::Distillation;
use crate::error::CompressError;
use medulla_core::{Clock, Cluster, IdGen, MemoryRecord, ARCHIVED_IMPORTANCE};
use medulla_storage::MemoryRepo;
use std::collections::HashMap;

/// Outcome of a successful archival.
#[derive(Debug, Clone)]
pub struct CompressedWrite {
    pub compressed: MemoryRecord,
    pub archived_members: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
}

/// Writes compressed rows and downgrades their sources.
pub struct ArchiveWriter<I: IdGen, C: Clock> {
    repo: MemoryRepo,
    idgen: I,
    clock: C,
}

impl<I: IdGen, C: Clock> ArchiveWriter<I, C> {
    pub fn new(repo: MemoryRepo, idgen: I, clock: C) -> Self {
        Self { repo, idgen, clock }
    }

    /// Commit one distillation: insert the compressed row, then downgrade
    /// every source. Any downgrade failure rolls the whole write back.
    pub fn commit(
        &self,
        cluster: &Cluster,
        members: &[MemoryRecord],
        distillation: &Distillation,
        run_id: &str,
    ) -> Result<CompressedWrite, CompressError> {
        let compressed = self.build_compressed(cluster, members, distillation);
        self.repo.insert(&compressed)?;

        let mut originals: HashMap<&str, f64> = HashMap::new();
        for member in members {
            match self
                .repo
                .archive_member(&member.id, run_id, ARCHIVED_IMPORTANCE)
            {
                Ok(original) => {
                    originals.insert(member.id.as_str(), original);
                }
                Err(e) => {
                    tracing::error!(
                        member = %member.id,
                        error = %e,
                        "archive failed mid-cluster, rolling back"
                    );
                    self.rollback(&compressed.id, &originals);
                    return Err(e.into());
                }
            }
        }

        let tokens_before = members
            .iter()
            .map(|m| medulla_core::token_count(&m.content))
            .sum();
        let tokens_after = medulla_core::token_count(&compressed.content);
        Ok(CompressedWrite {
            compressed,
            archived_members: members.len(),
            tokens_before,
            tokens_after,
        })
    }

    fn build_compressed(
        &self,
        cluster: &Cluster,
        members: &[MemoryRecord],
        distillation: &Distillation,
    ) -> MemoryRecord {
        let mut categories = top_categories(members, 2);
        categories.push("compressed".to_string());
        let importance = members
            .iter()
            .map(|m| m.importance)
            .fold(0.0_f64, f64::max);

        MemoryRecord {
            id: format!("mem-{}", self.idgen.next()),
            content: distillation.abstraction.clone(),
            categories,
            importance,
            timestamp: self.clock.epoch_ms(),
            compressed_from: Some(cluster.member_ids.clone()),
            archived_by: None,
        }
    }

    /// Compensating writes: restore captured importances, delete the
    /// compressed row. Best effort per member; every failure is logged.
    fn rollback(&self, compressed_id: &str, originals: &HashMap<&str, f64>) {
        for (member_id, original) in originals {
            if let Err(e) = self.repo.restore_member(member_id, *original) {
                tracing::error!(member = %member_id, error = %e, "rollback restore failed");
            }
        }
        if let Err(e) = self.repo.delete(compressed_id) {
            tracing::error!(compressed = %compressed_id, error = %e, "rollback delete failed");
        }
    }
}

/// The top `n` categories by frequency, first-seen order breaking ties.
fn top_categories(members: &[MemoryRecord], n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for member in members {
        for category in &member.categories {
            if !counts.contains_key(category.as_str()) {
                order.push(category);
            }
            *counts.entry(category).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(usize, &str)> = order
        .iter()
        .enumerate()
        .map(|(position, category)| (position, *category))
        .collect();
    ranked.sort_by(|a, b| {
        let ca = counts.get(a.1).copied().unwrap_or(0);
        let cb = counts.get(b.1).copied().unwrap_or(0);
        cb.cmp(&ca).then(a.0.cmp(&b.0))
    });
    ranked.into_iter().take(n).map(|(_, c)| c.to_string()).collect()
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
