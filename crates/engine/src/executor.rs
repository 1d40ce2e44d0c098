// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook executor: pre-verification, sequential steps under per-step
//! timeouts, post-execution verification, escalation signalling.
//!
//! The classifier is a constructor-injected capability ([`ClassifyFn`]),
//! never resolved by name at the verification point.

use crate::classify::ClassifyFn;
use crate::error::HealingError;
use crate::incident::IncidentManager;
use medulla_adapters::subprocess::run_argv;
use medulla_adapters::DataSourceAdapter;
use medulla_core::{Anomaly, Clock, HealingConfig, IdGen, Incident, IncidentState, RunbookMode};
use medulla_runbook::{RunbookDefinition, Step, StepAction, StepContext, StepResult};
use medulla_storage::{MetricsSink, RunbookMetaRepo};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Probes addressable by source id, for verification re-polls.
#[derive(Clone, Default)]
pub struct ProbeSet {
    probes: HashMap<String, Arc<dyn DataSourceAdapter>>,
}

impl ProbeSet {
    pub fn new(probes: Vec<Arc<dyn DataSourceAdapter>>) -> Self {
        Self {
            probes: probes
                .into_iter()
                .map(|p| (p.source_id().to_string(), p))
                .collect(),
        }
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<dyn DataSourceAdapter>> {
        self.probes.get(source_id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DataSourceAdapter>> {
        self.probes.values()
    }
}

/// One executed (or rehearsed) step.
#[derive(Debug, Clone)]
pub struct ExecutedStep {
    pub step_id: String,
    pub result: StepResult,
}

/// Outcome of one executor invocation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub mode: RunbookMode,
    pub steps_executed: Vec<ExecutedStep>,
    /// `None` when verification did not run (dry run, step failure,
    /// self-resolve).
    pub verification_passed: Option<bool>,
    pub escalation_needed: bool,
    /// The anomaly vanished before remediation started.
    pub self_resolved: bool,
}

/// Executes runbooks against incidents.
pub struct RunbookExecutor<I: IdGen, C: Clock> {
    classify: ClassifyFn,
    probes: ProbeSet,
    incidents: IncidentManager<I, C>,
    meta: RunbookMetaRepo,
    metrics: MetricsSink,
    config: HealingConfig,
    clock: C,
}

impl<I: IdGen, C: Clock> RunbookExecutor<I, C> {
    /// `classify` must be the same capability the monitor classifies with;
    /// verification re-uses it on fresh readings.
    pub fn new(
        classify: ClassifyFn,
        probes: ProbeSet,
        incidents: IncidentManager<I, C>,
        meta: RunbookMetaRepo,
        metrics: MetricsSink,
        config: HealingConfig,
        clock: C,
    ) -> Self {
        Self {
            classify,
            probes,
            incidents,
            meta,
            metrics,
            config,
            clock,
        }
    }

    /// Resolve the mode this execution runs under.
    fn effective_mode(
        &self,
        definition: &dyn RunbookDefinition,
        force_dry_run: bool,
    ) -> Result<RunbookMode, HealingError> {
        if force_dry_run || !definition.auto_approve_whitelist() {
            return Ok(RunbookMode::DryRun);
        }
        Ok(self.meta.load_or_init(definition.id())?.mode)
    }

    /// Execute one runbook for one incident.
    pub async fn execute(
        &self,
        definition: &Arc<dyn RunbookDefinition>,
        incident: &Incident,
        anomaly: &Anomaly,
        force_dry_run: bool,
    ) -> Result<ExecutionResult, HealingError> {
        let span = tracing::info_span!(
            "runbook",
            runbook = definition.id(),
            incident = incident.id.as_str()
        );
        let _guard = span.enter();

        let mode = self.effective_mode(definition.as_ref(), force_dry_run)?;
        let steps = definition.build(anomaly);

        if steps.is_empty() {
            tracing::warn!("runbook built no steps");
            return Ok(ExecutionResult {
                success: false,
                mode,
                steps_executed: Vec::new(),
                verification_passed: None,
                escalation_needed: true,
                self_resolved: false,
            });
        }

        // Pre-execution verification: live mode only. If the anomaly is
        // already gone, close out without touching anything.
        if mode == RunbookMode::AutoExecute && self.anomaly_cleared(anomaly).await {
            self.incidents.transition(
                incident.id.as_str(),
                IncidentState::SelfResolved,
                "executor",
                "anomaly absent on pre-execution probe",
            )?;
            return Ok(ExecutionResult {
                success: true,
                mode,
                steps_executed: Vec::new(),
                verification_passed: None,
                escalation_needed: false,
                self_resolved: true,
            });
        }

        self.incidents.transition(
            incident.id.as_str(),
            IncidentState::Remediating,
            "executor",
            &format!("runbook {} in {} mode", definition.id(), mode),
        )?;

        let context = StepContext {
            anomaly: anomaly.clone(),
            incident_id: incident.id.as_str().to_string(),
            vars: HashMap::new(),
        };

        let mut steps_executed = Vec::new();
        let mut step_failed = false;
        for step in &steps {
            let result = match mode {
                RunbookMode::DryRun => StepResult::success(step.dry_run.clone()),
                RunbookMode::AutoExecute => self.run_step(step, &context).await,
            };
            self.metrics.write_or_log(
                "heal_step_duration_ms",
                result.duration_ms as f64,
                &format!("runbook={},step={}", definition.id(), step.id),
            );
            let failed = !result.is_success();
            steps_executed.push(ExecutedStep {
                step_id: step.id.clone(),
                result,
            });
            if failed {
                step_failed = true;
                break;
            }
        }

        let now = self.clock.epoch_ms();
        match mode {
            RunbookMode::DryRun => {
                self.meta.record_dry_run(
                    definition.id(),
                    now,
                    self.config.dry_run_graduation_count,
                    &self.config.auto_execute_whitelist,
                )?;
                Ok(ExecutionResult {
                    success: !step_failed,
                    mode,
                    steps_executed,
                    verification_passed: None,
                    escalation_needed: false,
                    self_resolved: false,
                })
            }
            RunbookMode::AutoExecute if step_failed => {
                let last_output = steps_executed
                    .last()
                    .map(|s| s.result.output.clone())
                    .unwrap_or_default();
                self.incidents.transition(
                    incident.id.as_str(),
                    IncidentState::RemediationFailed,
                    "executor",
                    &format!("step failed: {last_output}"),
                )?;
                self.meta.record_live_run(definition.id(), false, now)?;
                Ok(ExecutionResult {
                    success: false,
                    mode,
                    steps_executed,
                    verification_passed: None,
                    escalation_needed: true,
                    self_resolved: false,
                })
            }
            RunbookMode::AutoExecute => {
                let verification_passed = self.verify(incident, anomaly).await?;
                self.meta
                    .record_live_run(definition.id(), verification_passed, now)?;
                Ok(ExecutionResult {
                    success: verification_passed,
                    mode,
                    steps_executed,
                    verification_passed: Some(verification_passed),
                    escalation_needed: !verification_passed,
                    self_resolved: false,
                })
            }
        }
    }

    /// Run one step live, racing its timeout.
    async fn run_step(&self, step: &Step, context: &StepContext) -> StepResult {
        // untrusted inputs are rejected before any external invocation
        if let Some(rejection) = step.validate_inputs() {
            tracing::warn!(step = %step.id, "step input rejected");
            return rejection;
        }

        let start = self.clock.now();
        let timeout = Duration::from_millis(step.timeout_ms);
        let body = async {
            match &step.action {
                StepAction::Command { argv } => {
                    // the outer race owns the deadline; give the inner
                    // command room so the timeout message is ours
                    let inner_timeout = timeout.saturating_mul(2).max(Duration::from_secs(1));
                    match run_argv(argv, None, inner_timeout, &step.id).await {
                        Ok(output) if output.status.success() => StepResult::success(
                            String::from_utf8_lossy(&output.stdout).trim().to_string(),
                        ),
                        Ok(output) => StepResult::failed(format!(
                            "exit {}: {}",
                            output.status.code().unwrap_or(-1),
                            String::from_utf8_lossy(&output.stderr).trim()
                        )),
                        Err(e) => StepResult::failed(e),
                    }
                }
                StepAction::Custom(runner) => runner.run(context).await,
            }
        };

        let result = match tokio::time::timeout(timeout, body).await {
            Ok(result) => result,
            Err(_) => StepResult::failed(format!(
                "Step {} timed out after {}ms",
                step.id, step.timeout_ms
            )),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        result.with_duration(duration_ms)
    }

    /// Whether the anomaly no longer reproduces on a fresh reading.
    async fn anomaly_cleared(&self, anomaly: &Anomaly) -> bool {
        let Some(probe) = self.probes.get(&anomaly.source_id) else {
            return false;
        };
        let reading = probe.poll().await;
        if !reading.available {
            return false;
        }
        let key = (anomaly.anomaly_type, anomaly.target_id.as_str());
        !(self.classify)(&reading)
            .iter()
            .any(|a| a.key() == key)
    }

    /// Post-execution verification: wait, then require
    /// `min_clear_readings` consecutive clear polls.
    async fn verify(&self, incident: &Incident, anomaly: &Anomaly) -> Result<bool, HealingError> {
        self.incidents.transition(
            incident.id.as_str(),
            IncidentState::Verifying,
            "executor",
            "waiting for post-execution probe",
        )?;

        tokio::time::sleep(Duration::from_millis(self.config.verification_interval_ms)).await;

        let required = self.config.min_clear_readings.max(1);
        for _ in 0..required {
            if !self.anomaly_cleared(anomaly).await {
                self.incidents.transition(
                    incident.id.as_str(),
                    IncidentState::RemediationFailed,
                    "executor",
                    "anomaly still present after remediation",
                )?;
                return Ok(false);
            }
        }

        self.incidents.transition(
            incident.id.as_str(),
            IncidentState::Resolved,
            "executor",
            "verification probe clear",
        )?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
