// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atom enrichment: derive a causal atom from a compression, deduplicated
//! against the existing atom set.

use crate::distill::Distillation;
use crate::error::CompressError;
use medulla_adapters::SimilarityModel;
use medulla_core::{Atom, Clock, Cluster, IdGen};
use medulla_storage::MemoryRepo;
use std::sync::Arc;

/// Derives atoms from causal distillations.
pub struct AtomEnricher<I: IdGen, C: Clock> {
    repo: MemoryRepo,
    model: Arc<dyn SimilarityModel>,
    dedup_similarity: f64,
    idgen: I,
    clock: C,
}

impl<I: IdGen, C: Clock> AtomEnricher<I, C> {
    pub fn new(
        repo: MemoryRepo,
        model: Arc<dyn SimilarityModel>,
        dedup_similarity: f64,
        idgen: I,
        clock: C,
    ) -> Self {
        Self {
            repo,
            model,
            dedup_similarity,
            idgen,
            clock,
        }
    }

    /// Derive and store an atom for a causal distillation. Returns the
    /// atom if one was written, `None` for non-causal abstractions and
    /// near-duplicates.
    pub fn enrich(
        &self,
        cluster: &Cluster,
        distillation: &Distillation,
    ) -> Result<Option<Atom>, CompressError> {
        if !distillation.is_causal {
            return Ok(None);
        }

        for existing in self.repo.atoms()? {
            let similarity = self
                .model
                .similarity(&existing.action, &distillation.abstraction);
            if similarity >= self.dedup_similarity {
                tracing::debug!(
                    cluster = %cluster.cluster_id,
                    existing = %existing.id,
                    similarity,
                    "atom deduplicated"
                );
                return Ok(None);
            }
        }

        let atom = Atom {
            id: format!("atom-{}", self.idgen.next()),
            subject: cluster.dominant_category.clone(),
            action: distillation.abstraction.clone(),
            outcome: format!("distilled from {} memories", cluster.member_ids.len()),
            consequences: format!(
                "compression ratio {:.1}",
                distillation.compression_ratio
            ),
            confidence: cluster.avg_similarity.clamp(0.0, 1.0),
            source: "compression".to_string(),
            created_at: self.clock.epoch_ms(),
            categories: vec![cluster.dominant_category.clone()],
        };
        self.repo.insert_atom(&atom)?;
        Ok(Some(atom))
    }
}

#[cfg(test)]
#[path = "enrich_tests.rs"]
mod tests;
