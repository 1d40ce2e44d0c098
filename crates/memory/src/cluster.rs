// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster finder: deterministic similarity-window grouping of
//! short-term memories eligible for compression.

use crate::error::CompressError;
use medulla_core::{cluster_fingerprint, token_count, Clock, Cluster, CompressionConfig, MemoryRecord};
use medulla_storage::MemoryRepo;
use medulla_adapters::SimilarityModel;
use std::collections::HashMap;
use std::sync::Arc;

/// Groups old-enough memories into compression candidates.
pub struct ClusterFinder<C: Clock> {
    repo: MemoryRepo,
    model: Arc<dyn SimilarityModel>,
    config: CompressionConfig,
    clock: C,
}

impl<C: Clock> ClusterFinder<C> {
    pub fn new(
        repo: MemoryRepo,
        model: Arc<dyn SimilarityModel>,
        config: CompressionConfig,
        clock: C,
    ) -> Self {
        Self {
            repo,
            model,
            config,
            clock,
        }
    }

    /// Scan and cluster. Returns clusters plus the number of memories
    /// scanned.
    pub fn find(&self) -> Result<(Vec<Cluster>, usize), CompressError> {
        let cutoff = self
            .clock
            .epoch_ms()
            .saturating_sub(self.config.stm_min_age_ms);
        let memories = self.repo.compressible_before(cutoff)?;
        let scanned = memories.len();
        let clusters = self.cluster(&memories);
        Ok((clusters, scanned))
    }

    /// Greedy neighborhood clustering: walk memories oldest-first, seed a
    /// cluster with the first unclaimed one, pull in every later
    /// unclaimed memory whose similarity to the seed clears the
    /// threshold, bounded by the token budget. Deterministic for a given
    /// row set.
    fn cluster(&self, memories: &[MemoryRecord]) -> Vec<Cluster> {
        let mut claimed = vec![false; memories.len()];
        let mut clusters = Vec::new();

        for seed_idx in 0..memories.len() {
            if claimed[seed_idx] {
                continue;
            }
            let seed = &memories[seed_idx];
            let mut member_idx = vec![seed_idx];
            let mut total_tokens = token_count(&seed.content);
            let mut similarity_sum = 0.0;

            for other_idx in (seed_idx + 1)..memories.len() {
                if claimed[other_idx] {
                    continue;
                }
                let other = &memories[other_idx];
                let tokens = token_count(&other.content);
                if total_tokens + tokens > self.config.max_cluster_tokens {
                    continue;
                }
                let similarity = self.model.similarity(&seed.content, &other.content);
                if similarity >= self.config.cluster_similarity_threshold {
                    member_idx.push(other_idx);
                    total_tokens += tokens;
                    similarity_sum += similarity;
                }
            }

            if member_idx.len() < self.config.cluster_min_members {
                continue;
            }
            for &idx in &member_idx {
                claimed[idx] = true;
            }

            let members: Vec<&MemoryRecord> = member_idx.iter().map(|&i| &memories[i]).collect();
            let member_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
            let avg_similarity = similarity_sum / (member_idx.len() - 1) as f64;
            let fingerprint = cluster_fingerprint(&member_ids);

            clusters.push(Cluster {
                cluster_id: format!("cl-{fingerprint}"),
                fingerprint,
                avg_similarity,
                dominant_category: dominant_category(&members),
                total_tokens,
                oldest_member_at: members.iter().map(|m| m.timestamp).min().unwrap_or(0),
                member_ids,
            });
        }
        clusters
    }
}

/// Most frequent category across members; first-seen order breaks ties.
fn dominant_category(members: &[&MemoryRecord]) -> String {
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
    let mut best: Option<(&str, usize)> = None;
    for category in order {
        let count = counts.get(category).copied().unwrap_or(0);
        if best.map(|(_, n)| count > n).unwrap_or(true) {
            best = Some((category, count));
        }
    }
    best.map(|(c, _)| c.to_string())
        .unwrap_or_else(|| "general".to_string())
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
