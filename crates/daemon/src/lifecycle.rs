// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, wiring, shutdown, boot maintenance.

use crate::env::Paths;
use fs2::FileExt;
use medulla_adapters::probes::{DiskProbe, GatewayProbe, MemoryProbe, ProcessProbe};
use medulla_adapters::{
    CommandChannel, CommandCortexAdapter, CortexRouter, DataSourceAdapter, DesktopChannel,
    TokenOverlapModel,
};
use medulla_core::{Domain, IdGen, MedullaConfig, SystemClock, UuidIdGen};
use medulla_engine::{
    default_rules, AnomalyClassifier, EscalationRouter, HealingMonitor, IncidentManager, ProbeSet,
    RunbookExecutor,
};
use medulla_learning::{
    detection_queue, run_drain_loop, CorrectionScanner, DetectionQueue, FailureClassifier,
    HookViolationRelay, LearningPipeline, PipelineFailRelay, RegressionGenerator, SopPatcher,
    ToolMonitor, TrustEventRelay,
};
use medulla_memory::{
    ArchiveWriter, AtomEnricher, ClusterFinder, CompressionRun, CrossDomainMatcher, Distiller,
    Extractor, ExternalDbExtractor, GenericExtractor, SessionPreserver,
};
use medulla_runbook::builtin_runbooks;
use medulla_storage::{
    run_migrations, FailureRepo, IncidentRepo, MemoryRepo, MetricsSink, RunbookMetaRepo,
    SessionRepo, Store,
};
use medulla_synapse::{ExternalChannel, NoOpChannel, Priority, Synapse};
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const DAY_MS: u64 = 86_400_000;
/// Knowledge cadence: one compression + cross-domain pass every six hours.
const KNOWLEDGE_INTERVAL: Duration = Duration::from_secs(6 * 3_600);
/// Cosine floor for cross-domain pattern matches.
const CROSS_DOMAIN_SIMILARITY: f64 = 0.6;
/// Matches kept per domain pair.
const CROSS_DOMAIN_TOP_N: usize = 3;
/// Metaphors quoted in one bus report.
const CROSS_DOMAIN_REPORTED: usize = 3;

/// Errors during daemon startup and shutdown.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another daemon holds the lock at {0}")]
    AlreadyRunning(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(#[from] medulla_storage::StoreError),
    #[error("config error: {0}")]
    Config(#[from] medulla_core::config::ConfigError),
}

/// One external database the cross-domain matcher extracts patterns
/// from (trading signals, radio events, fleet events).
#[derive(Debug, Clone)]
pub struct PatternDbSource {
    pub domain: Domain,
    pub db_path: String,
    pub table: String,
    pub text_column: String,
    pub limit: i64,
}

/// Deployment-level options the core config does not carry: which
/// processes to supervise and how to reach external services.
#[derive(Debug, Clone, Default)]
pub struct DaemonConfig {
    /// Process names watched by liveness probes.
    pub supervised_processes: Vec<String>,
    /// Mount points watched by disk probes.
    pub disk_mounts: Vec<String>,
    /// Gateway health checks: (name, health command argv).
    pub gateways: Vec<(String, Vec<String>)>,
    /// Guaranteed tier-3 delivery command (SMS gateway script).
    pub guaranteed_channel_argv: Option<Vec<String>>,
    /// Cortex completion command; compression stays idle without one.
    pub cortex_argv: Option<Vec<String>>,
    /// External databases for the cross-domain matcher. The matcher
    /// always runs; without sources it matches own atoms only.
    pub pattern_sources: Vec<PatternDbSource>,
    /// Whether bus messages also surface as desktop notifications.
    pub desktop_notifications: bool,
}

type DaemonSynapse = Synapse<UuidIdGen, SystemClock>;

/// A running daemon: relays for the host agent, and the handles needed
/// to stop cleanly.
pub struct Daemon {
    pub paths: Paths,
    pub config: MedullaConfig,
    pub synapse: DaemonSynapse,
    pub queue: DetectionQueue,
    pub tool_monitor: ToolMonitor,
    pub correction_scanner: Arc<CorrectionScanner<SystemClock>>,
    pub hook_relay: HookViolationRelay,
    pub trust_relay: TrustEventRelay,
    pub pipeline_relay: PipelineFailRelay,
    pub session_preserver: Arc<SessionPreserver<SystemClock>>,
    pub cross_domain: Arc<CrossDomainMatcher>,
    incidents: IncidentManager<UuidIdGen, SystemClock>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl Daemon {
    /// Start the daemon: lock, migrate, boot-maintain, wire, spawn.
    pub async fn start(paths: Paths, daemon_config: DaemonConfig) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(&paths.state_dir)?;

        // open without truncating: a losing contender must not wipe the
        // winner's pid
        let lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&paths.lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(LifecycleError::AlreadyRunning(
                paths.lock_path.display().to_string(),
            ));
        }
        std::fs::write(&paths.lock_path, std::process::id().to_string())?;

        let config = MedullaConfig::load(&paths.config_path)?;
        let clock = SystemClock;
        let idgen = UuidIdGen;

        let store = Store::open(&paths.db_path)?;
        run_migrations(&store)?;
        let metrics = MetricsSink::open(&paths.metrics_path)?;

        let incidents_repo = IncidentRepo::new(store.clone());
        let failures_repo = FailureRepo::new(store.clone());
        let memories_repo = MemoryRepo::new(store.clone());
        let sessions_repo = SessionRepo::new(store.clone());
        let runbook_meta = RunbookMetaRepo::new(store.clone());

        Self::boot_maintenance(&config, &incidents_repo, &sessions_repo, &clock);

        // bus: in-process fan-out plus one external channel
        let bus_channel: Arc<dyn ExternalChannel> = if daemon_config.desktop_notifications {
            Arc::new(DesktopChannel::new())
        } else {
            Arc::new(NoOpChannel)
        };
        let synapse = Synapse::new(bus_channel, idgen.clone(), clock.clone());

        // guaranteed tier-3 channel is independent of the bus channel
        let guaranteed: Arc<dyn ExternalChannel> = match &daemon_config.guaranteed_channel_argv {
            Some(argv) => Arc::new(CommandChannel::new("guaranteed", argv.clone())),
            None => {
                warn!("no guaranteed channel configured; tier 3 falls back to no-op");
                Arc::new(NoOpChannel)
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        // --- self-healing ---
        let probes = Self::build_probes(&config, &daemon_config);
        let classifier = AnomalyClassifier::new(default_rules());
        let incidents = IncidentManager::new(incidents_repo, idgen.clone(), clock.clone());
        let executor = Arc::new(RunbookExecutor::new(
            classifier.as_fn(),
            probes.clone(),
            incidents.clone(),
            runbook_meta.clone(),
            metrics.clone(),
            config.healing.clone(),
            clock.clone(),
        ));
        let escalation = Arc::new(EscalationRouter::new(
            synapse.clone(),
            guaranteed,
            metrics.clone(),
            config.healing.confidence_auto_execute,
        ));
        let monitor = Arc::new(HealingMonitor::new(
            classifier,
            probes,
            incidents.clone(),
            executor,
            escalation,
            builtin_runbooks(),
            runbook_meta,
            config.healing.clone(),
            clock.clone(),
        ));
        handles.extend(monitor.spawn(shutdown_rx.clone()));

        // --- real-time learning ---
        let (queue, queue_rx) = detection_queue(config.learning.queue_capacity);
        let sop_dir = if config.learning.sop_directory.is_absolute() {
            config.learning.sop_directory.clone()
        } else {
            paths.state_dir.join(&config.learning.sop_directory)
        };
        let pipeline = Arc::new(LearningPipeline::new(
            failures_repo.clone(),
            memories_repo.clone(),
            SopPatcher::new(sop_dir, clock.clone()),
            RegressionGenerator::new(
                paths.regression_root.clone(),
                failures_repo,
                clock.clone(),
            ),
            synapse.clone(),
            metrics.clone(),
            FailureClassifier::default(),
            config.learning.clone(),
            idgen.clone(),
            clock.clone(),
        ));
        handles.push(tokio::spawn(run_drain_loop(
            queue_rx,
            pipeline,
            shutdown_rx.clone(),
        )));

        let tool_monitor = ToolMonitor::new(queue.clone());
        let correction_scanner = Arc::new(CorrectionScanner::new(
            queue.clone(),
            config.learning.correction_keywords.clone(),
            config.learning.correction_scan_window_ms,
            clock.clone(),
        ));
        let hook_relay = HookViolationRelay::new(queue.clone());
        let trust_relay = TrustEventRelay::new(queue.clone());
        let pipeline_relay = PipelineFailRelay::new(queue.clone());

        // --- knowledge compression + cross-domain matching ---
        let compression = match &daemon_config.cortex_argv {
            Some(argv) => {
                let adapter = Arc::new(CommandCortexAdapter::new(argv.clone()));
                let router = CortexRouter::new(adapter, config.cortex.clone(), clock.clone());
                Some(CompressionRun::new(
                    ClusterFinder::new(
                        memories_repo.clone(),
                        Arc::new(TokenOverlapModel),
                        config.compression.clone(),
                        clock.clone(),
                    ),
                    Distiller::new(router, config.compression.clone()),
                    ArchiveWriter::new(memories_repo.clone(), idgen.clone(), clock.clone()),
                    AtomEnricher::new(
                        memories_repo.clone(),
                        Arc::new(TokenOverlapModel),
                        config.compression.atom_dedup_similarity,
                        idgen.clone(),
                        clock.clone(),
                    ),
                    memories_repo.clone(),
                    paths.reports_dir.clone(),
                    idgen.clone(),
                    clock.clone(),
                ))
            }
            None => {
                info!("no cortex command configured; compression runs disabled");
                None
            }
        };

        let cross_domain = Arc::new(Self::build_cross_domain(
            &daemon_config,
            &paths,
            memories_repo,
            clock.clone(),
        ));
        {
            let cross_domain = Arc::clone(&cross_domain);
            let synapse = synapse.clone();
            let metrics = metrics.clone();
            let idgen = idgen.clone();
            let mut shutdown = shutdown_rx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(KNOWLEDGE_INTERVAL) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                return;
                            }
                        }
                    }
                    if let Some(run) = &compression {
                        if let Err(e) = run.execute().await {
                            tracing::error!(error = %e, "compression run failed");
                        }
                    }
                    let run_id = format!("xd-{}", idgen.next());
                    match cross_domain.run(&run_id) {
                        Ok(matches) if matches.is_empty() => {
                            tracing::debug!(run = %run_id, "cross-domain pass found no matches");
                        }
                        Ok(matches) => {
                            metrics.write_or_log(
                                "crossdomain_matches",
                                matches.len() as f64,
                                &format!("run={run_id}"),
                            );
                            let body = matches
                                .iter()
                                .take(CROSS_DOMAIN_REPORTED)
                                .map(|m| format!("({:.2}) {}", m.similarity, m.metaphor))
                                .collect::<Vec<_>>()
                                .join("\n");
                            if let Err(e) = synapse
                                .send("memory.cross_domain", &body, Priority::Info, None)
                                .await
                            {
                                tracing::warn!(error = %e, "cross-domain report delivery failed");
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "cross-domain matching failed");
                        }
                    }
                }
            }));
        }

        let session_preserver = Arc::new(SessionPreserver::new(
            sessions_repo,
            paths.sessions_dir.clone(),
            config.session.clone(),
            clock,
        ));

        info!(state_dir = %paths.state_dir.display(), "medullad started");
        Ok(Self {
            paths,
            config,
            synapse,
            queue,
            tool_monitor,
            correction_scanner,
            hook_relay,
            trust_relay,
            pipeline_relay,
            session_preserver,
            cross_domain,
            incidents,
            shutdown_tx,
            handles,
            lock_file,
        })
    }

    /// The matcher always carries the meta extractor over own atoms;
    /// configured external sources are validated here and rejected ones
    /// are skipped, never fatal.
    fn build_cross_domain(
        daemon_config: &DaemonConfig,
        paths: &Paths,
        memories: MemoryRepo,
        clock: SystemClock,
    ) -> CrossDomainMatcher {
        let mut extractors: Vec<Arc<dyn Extractor>> =
            vec![Arc::new(GenericExtractor::new(memories, clock))];
        for source in &daemon_config.pattern_sources {
            match ExternalDbExtractor::new(
                source.domain,
                &source.db_path,
                &paths.db_path,
                &source.table,
                &source.text_column,
                source.limit,
            ) {
                Ok(extractor) => extractors.push(Arc::new(extractor)),
                Err(e) => {
                    warn!(
                        domain = %source.domain,
                        db_path = %source.db_path,
                        error = %e,
                        "pattern source rejected"
                    );
                }
            }
        }
        CrossDomainMatcher::new(extractors, CROSS_DOMAIN_SIMILARITY, CROSS_DOMAIN_TOP_N)
    }

    /// Operator dismissal with the configured default window. Channel
    /// adapters route `dismiss <incident>` commands here.
    pub fn dismiss_incident(
        &self,
        incident_id: &str,
        reason: &str,
    ) -> Result<(), medulla_engine::HealingError> {
        self.incidents
            .dismiss(
                incident_id,
                reason,
                self.config.healing.incident_dismiss_window_ms,
            )
            .map(|_| ())
    }

    /// Boot maintenance: purge expired terminal incidents and stale
    /// sessions. Failures log and never block startup.
    fn boot_maintenance(
        config: &MedullaConfig,
        incidents: &IncidentRepo,
        sessions: &SessionRepo,
        clock: &SystemClock,
    ) {
        use medulla_core::Clock;
        let now = clock.epoch_ms();

        match incidents.purge_terminal_before(now.saturating_sub(config.healing.incident_retention_ms))
        {
            Ok(0) => {}
            Ok(purged) => info!(purged, "expired terminal incidents purged"),
            Err(e) => warn!(error = %e, "incident purge failed"),
        }

        let session_cutoff =
            now.saturating_sub(u64::from(config.session.lookback_days) * DAY_MS);
        match sessions.purge_before(session_cutoff) {
            Ok(0) => {}
            Ok(purged) => info!(purged, "stale sessions purged"),
            Err(e) => warn!(error = %e, "session purge failed"),
        }
    }

    fn build_probes(config: &MedullaConfig, daemon_config: &DaemonConfig) -> ProbeSet {
        let mut probes: Vec<Arc<dyn DataSourceAdapter>> = Vec::new();

        probes.push(Arc::new(MemoryProbe::new(
            config.probe_interval_ms("probe-memory", 30_000),
        )));

        for mount in &daemon_config.disk_mounts {
            let source = format!("probe-disk:{mount}");
            probes.push(Arc::new(DiskProbe::new(
                mount,
                config.probe_interval_ms(&source, 60_000),
            )));
        }

        for process in &daemon_config.supervised_processes {
            let source = format!("probe-process:{process}");
            match ProcessProbe::new(process, config.probe_interval_ms(&source, 30_000)) {
                Some(probe) => probes.push(Arc::new(probe)),
                None => warn!(process, "unsafe process name, probe skipped"),
            }
        }

        for (name, argv) in &daemon_config.gateways {
            let source = format!("probe-gateway:{name}");
            probes.push(Arc::new(GatewayProbe::new(
                name,
                argv.clone(),
                config.probe_interval_ms(&source, 60_000),
            )));
        }

        ProbeSet::new(probes)
    }

    /// Graceful stop: signal every loop, await the tasks.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "task join failed during shutdown");
            }
        }
        info!("medullad stopped");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
