// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Healing monitor: one polling loop per probe, feeding the classifier,
//! incident manager, executor, and escalation router.

use crate::classify::AnomalyClassifier;
use crate::error::HealingError;
use crate::escalation::{EscalationContext, EscalationRouter};
use crate::executor::{ProbeSet, RunbookExecutor};
use crate::incident::{IncidentManager, Upsert};
use medulla_core::{Anomaly, Clock, HealingConfig, IdGen, Reading, RunbookMode};
use medulla_runbook::RunbookRegistry;
use medulla_storage::RunbookMetaRepo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Drives the probe → anomaly → incident → runbook → escalation flow.
pub struct HealingMonitor<I: IdGen, C: Clock> {
    classifier: AnomalyClassifier,
    probes: ProbeSet,
    incidents: IncidentManager<I, C>,
    executor: Arc<RunbookExecutor<I, C>>,
    escalation: Arc<EscalationRouter<I, C>>,
    registry: RunbookRegistry,
    meta: RunbookMetaRepo,
    config: HealingConfig,
    clock: C,
}

impl<I: IdGen + 'static, C: Clock + 'static> HealingMonitor<I, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: AnomalyClassifier,
        probes: ProbeSet,
        incidents: IncidentManager<I, C>,
        executor: Arc<RunbookExecutor<I, C>>,
        escalation: Arc<EscalationRouter<I, C>>,
        registry: RunbookRegistry,
        meta: RunbookMetaRepo,
        config: HealingConfig,
        clock: C,
    ) -> Self {
        Self {
            classifier,
            probes,
            incidents,
            executor,
            escalation,
            registry,
            meta,
            config,
            clock,
        }
    }

    /// Classify one reading and process every resulting anomaly.
    pub async fn handle_reading(
        &self,
        reading: &Reading,
        freshness_threshold_ms: u64,
    ) -> Result<(), HealingError> {
        let mut anomalies = self.classifier.classify(reading);

        let age_ms = self.clock.epoch_ms().saturating_sub(reading.captured_at);
        if let Some(stale) = AnomalyClassifier::stale(reading, age_ms, freshness_threshold_ms) {
            anomalies.push(stale);
        }

        for anomaly in anomalies {
            if let Err(e) = self.process_anomaly(&anomaly).await {
                tracing::error!(
                    anomaly_type = %anomaly.anomaly_type,
                    target = %anomaly.target_id,
                    error = %e,
                    "anomaly processing failed"
                );
            }
        }
        Ok(())
    }

    /// Upsert, remediate, escalate one anomaly.
    async fn process_anomaly(&self, anomaly: &Anomaly) -> Result<(), HealingError> {
        let incident = match self.incidents.upsert(anomaly)? {
            Upsert::Opened(incident) => incident,
            // an open incident is already being handled; don't re-run
            Upsert::Refreshed(_) | Upsert::Dismissed(_) => return Ok(()),
        };

        let Some(definition) = self.registry.find_for(anomaly) else {
            let context = EscalationContext {
                runbook_id: None,
                runbook_mode: None,
                confidence: 0.0,
                remediation_failed: false,
                summary: format!(
                    "{} on {} has no runbook ({})",
                    anomaly.anomaly_type, anomaly.target_id, anomaly.severity
                ),
            };
            self.escalation.route(&incident, &context).await?;
            return Ok(());
        };

        let result = self
            .executor
            .execute(&definition, &incident, anomaly, false)
            .await?;

        if result.self_resolved {
            return Ok(());
        }

        let meta = self.meta.load_or_init(definition.id())?;
        let remediation_failed =
            result.mode == RunbookMode::AutoExecute && result.escalation_needed;
        let context = EscalationContext {
            runbook_id: Some(definition.id().to_string()),
            runbook_mode: Some(result.mode),
            confidence: meta.confidence,
            remediation_failed,
            summary: format!(
                "{} on {}: runbook {} ran in {} mode, success={}",
                anomaly.anomaly_type,
                anomaly.target_id,
                definition.id(),
                result.mode,
                result.success
            ),
        };
        // route against the refreshed incident so severity and state are
        // current
        let incident = self
            .incidents
            .repo()
            .get(incident.id.as_str())?
            .unwrap_or(incident);
        self.escalation.route(&incident, &context).await?;
        Ok(())
    }

    /// Spawn one polling task per probe. Tasks stop when `shutdown`
    /// flips to true.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            tracing::info!("healing disabled by config; no probe loops started");
            return Vec::new();
        }
        let mut handles = Vec::new();
        for probe in self.probes.iter() {
            let probe = probe.clone();
            let monitor = Arc::clone(&self);
            let mut shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                let interval = Duration::from_millis(probe.poll_interval_ms().max(100));
                let source = probe.source_id().to_string();
                tracing::info!(probe = %source, interval_ms = interval.as_millis() as u64, "probe loop started");
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                tracing::info!(probe = %source, "probe loop stopping");
                                return;
                            }
                        }
                    }
                    let reading = probe.poll().await;
                    if let Err(e) = monitor
                        .handle_reading(&reading, probe.freshness_threshold_ms())
                        .await
                    {
                        tracing::error!(probe = %source, error = %e, "reading handling failed");
                    }
                }
            }));
        }
        handles
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
