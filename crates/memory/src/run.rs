// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One scheduled compression pass: scan → cluster → distill → archive →
//! enrich → report.
//!
//! Individual cluster failures land in the report's error list; the run
//! keeps going.

use crate::archive::ArchiveWriter;
use crate::cluster::ClusterFinder;
use crate::distill::Distiller;
use crate::enrich::AtomEnricher;
use crate::error::CompressError;
use crate::report::CompressionReport;
use medulla_adapters::CortexAdapter;
use medulla_core::{Clock, IdGen};
use medulla_storage::MemoryRepo;
use serde_json::json;
use std::path::PathBuf;

/// Orchestrates a full compression pass.
pub struct CompressionRun<A: CortexAdapter, I: IdGen, C: Clock> {
    finder: ClusterFinder<C>,
    distiller: Distiller<A, C>,
    writer: ArchiveWriter<I, C>,
    enricher: AtomEnricher<I, C>,
    repo: MemoryRepo,
    reports_dir: PathBuf,
    idgen: I,
    clock: C,
}

impl<A: CortexAdapter, I: IdGen, C: Clock> CompressionRun<A, I, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        finder: ClusterFinder<C>,
        distiller: Distiller<A, C>,
        writer: ArchiveWriter<I, C>,
        enricher: AtomEnricher<I, C>,
        repo: MemoryRepo,
        reports_dir: PathBuf,
        idgen: I,
        clock: C,
    ) -> Self {
        Self {
            finder,
            distiller,
            writer,
            enricher,
            repo,
            reports_dir,
            idgen,
            clock,
        }
    }

    /// Execute one pass. Always produces a report artifact.
    pub async fn execute(&self) -> Result<CompressionReport, CompressError> {
        let run_id = format!("run-{}", self.idgen.next());
        let mut report = CompressionReport::new(&run_id, self.clock.epoch_ms());
        tracing::info!(run = %run_id, "compression run started");

        let (clusters, scanned) = match self.finder.find() {
            Ok(found) => found,
            Err(e) => {
                report.record_error(&e);
                report.finished_at = self.clock.epoch_ms();
                report.write_artifact(&self.reports_dir)?;
                return Ok(report);
            }
        };
        report.memories_scanned = scanned;
        report.clusters_found = clusters.len();

        for cluster in clusters {
            if let Err(e) = self.process_cluster(&cluster, &run_id, &mut report).await {
                report.record_error(format!("cluster {}: {e}", cluster.cluster_id));
            }
        }

        report.finished_at = self.clock.epoch_ms();
        let artifact = report.write_artifact(&self.reports_dir)?;
        tracing::info!(
            run = %run_id,
            artifact = %artifact.display(),
            "{}",
            report.render_human()
        );
        Ok(report)
    }

    async fn process_cluster(
        &self,
        cluster: &medulla_core::Cluster,
        run_id: &str,
        report: &mut CompressionReport,
    ) -> Result<(), CompressError> {
        if self.repo.fingerprint_seen(&cluster.fingerprint)? {
            report.clusters_skipped += 1;
            tracing::debug!(cluster = %cluster.cluster_id, "fingerprint already compressed, skipping");
            return Ok(());
        }

        let members: Vec<_> = cluster
            .member_ids
            .iter()
            .filter_map(|id| self.repo.get(id).transpose())
            .collect::<Result<_, _>>()?;

        let Some(distillation) = self.distiller.distill(cluster, &members).await? else {
            report.clusters_refused += 1;
            self.repo.log_compression(
                run_id,
                &cluster.fingerprint,
                None,
                None,
                self.clock.epoch_ms(),
                &json!({ "refused": true, "members": cluster.member_ids }),
            )?;
            return Ok(());
        };

        let write = self.writer.commit(cluster, &members, &distillation, run_id)?;
        report.clusters_compressed += 1;
        report.members_archived += write.archived_members;
        report.tokens_before += write.tokens_before;
        report.tokens_after += write.tokens_after;

        self.repo.log_compression(
            run_id,
            &cluster.fingerprint,
            Some(&write.compressed.id),
            Some(distillation.compression_ratio),
            self.clock.epoch_ms(),
            &json!({
                "members": cluster.member_ids,
                "is_causal": distillation.is_causal,
            }),
        )?;

        match self.enricher.enrich(cluster, &distillation)? {
            Some(_) => report.atoms_created += 1,
            None if distillation.is_causal => report.atoms_deduped += 1,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
