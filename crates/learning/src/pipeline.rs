// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Main learning pipeline: classify, persist, fan out, detect
//! recurrence.
//!
//! Propagation targets for one failure run sequentially so their
//! records are auditable in order; distinct failures are independent.

use crate::classifier::FailureClassifier;
use crate::error::LearnError;
use crate::regression::RegressionGenerator;
use crate::sop::SopPatcher;
use medulla_core::{
    Atom, Clock, DetectionPayload, FailureEvent, IdGen, LearningConfig, PropagationRecord,
    PropagationStatus, PropagationType, ShortId, Tier,
};
use medulla_storage::{FailureRepo, MemoryRepo, MetricsSink};
use medulla_synapse::{Priority, Synapse};

const DAY_MS: u64 = 86_400_000;

/// Drives one detection from payload to propagated (or escalated) row.
pub struct LearningPipeline<I: IdGen, C: Clock> {
    failures: FailureRepo,
    memories: MemoryRepo,
    patcher: SopPatcher<C>,
    regression: RegressionGenerator<C>,
    synapse: Synapse<I, C>,
    metrics: MetricsSink,
    classifier: FailureClassifier,
    config: LearningConfig,
    idgen: I,
    clock: C,
}

impl<I: IdGen, C: Clock> LearningPipeline<I, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        failures: FailureRepo,
        memories: MemoryRepo,
        patcher: SopPatcher<C>,
        regression: RegressionGenerator<C>,
        synapse: Synapse<I, C>,
        metrics: MetricsSink,
        classifier: FailureClassifier,
        config: LearningConfig,
        idgen: I,
        clock: C,
    ) -> Self {
        Self {
            failures,
            memories,
            patcher,
            regression,
            synapse,
            metrics,
            classifier,
            config,
            idgen,
            clock,
        }
    }

    pub fn failures(&self) -> &FailureRepo {
        &self.failures
    }

    /// Process one detection end to end.
    pub async fn process(&self, payload: DetectionPayload) -> Result<FailureEvent, LearnError> {
        let started = self.clock.now();
        let now_ms = self.clock.epoch_ms();
        let (root_cause, targets) = self.classifier.classify(&payload);

        let mut event = FailureEvent {
            id: self.idgen.next(),
            detected_at: now_ms,
            failure_type: payload.failure_type,
            tier: payload.tier,
            source: payload.source,
            context: payload.context,
            raw_input: payload.raw_input,
            failure_desc: payload.failure_desc,
            root_cause: root_cause.to_string(),
            propagation_status: PropagationStatus::Pending,
            recurrence_count: 0,
            last_recurred_at: None,
        };
        self.failures.insert(&event)?;
        self.failures
            .advance_status(&mut event, PropagationStatus::InProgress)?;

        tracing::info!(
            failure = %event.id,
            failure_type = %event.failure_type,
            tier = %event.tier,
            root_cause = %event.root_cause,
            targets = targets.len(),
            "failure classified"
        );

        let mut any_committed = false;
        for target in &targets {
            let committed = self.propagate(&event, *target, &targets).await;
            any_committed |= committed;
        }

        let final_status = if any_committed {
            PropagationStatus::Propagated
        } else {
            PropagationStatus::Escalated
        };
        self.failures.advance_status(&mut event, final_status)?;

        self.check_recurrence(&mut event).await?;

        let duration_ms = started.elapsed().as_millis() as f64;
        self.metrics.write_or_log(
            "rtl_processing_ms",
            duration_ms,
            &format!("type={},root_cause={}", event.failure_type, event.root_cause),
        );
        Ok(event)
    }

    /// Run one propagation target; returns whether it committed a durable
    /// side effect. Failures are recorded on the propagation row, never
    /// raised out of the fan-out.
    async fn propagate(
        &self,
        event: &FailureEvent,
        target: PropagationType,
        all_targets: &[PropagationType],
    ) -> bool {
        let now_ms = self.clock.epoch_ms();
        let mut record = PropagationRecord {
            id: format!("{}:{}", event.id, target),
            failure_id: event.id.clone(),
            started_at: now_ms,
            completed_at: None,
            propagation_type: target,
            target_file: None,
            commit_sha: None,
            synapse_msg_id: None,
            status: "in_progress".into(),
            diff_preview: None,
            error_detail: None,
        };
        if let Err(e) = self.failures.insert_propagation(&record) {
            tracing::error!(failure = %event.id, target = %target, error = %e, "propagation record insert failed");
            return false;
        }

        let committed = match self.run_target(event, target, all_targets, &mut record).await {
            Ok(committed) => committed,
            Err(e) => {
                record.status = "failed".into();
                record.error_detail = Some(e.to_string());
                tracing::error!(failure = %event.id, target = %target, error = %e, "propagation failed");
                false
            }
        };

        record.completed_at = Some(self.clock.epoch_ms());
        if let Err(e) = self.failures.update_propagation(&record) {
            tracing::error!(failure = %event.id, error = %e, "propagation record update failed");
        }
        committed
    }

    async fn run_target(
        &self,
        event: &FailureEvent,
        target: PropagationType,
        all_targets: &[PropagationType],
        record: &mut PropagationRecord,
    ) -> Result<bool, LearnError> {
        match target {
            PropagationType::SopPatch => {
                let apply = self.patcher.apply(event).await?;
                record.target_file = Some(apply.target_file.to_string_lossy().into_owned());
                record.commit_sha = apply.commit_sha.clone();
                record.diff_preview = Some(apply.diff_preview.clone());
                record.error_detail = apply.commit_error.clone();

                if event.tier >= Tier::T3 && apply.appended {
                    // preview only: the operator approves the commit
                    let thread = format!("rtl:{}", event.id);
                    let on_timeout = match self.config.tier3_default_on_timeout {
                        medulla_core::Tier3TimeoutAction::Skip => "skip",
                        medulla_core::Tier3TimeoutAction::Commit => "commit",
                    };
                    let body = format!(
                        "Tier-3 SOP patch for {} awaits approval \
                         (expires in {} min, then {on_timeout}).\n\n{}\n\
                         Reply `approve {thread}` to commit or `dismiss {thread}` to drop.",
                        event.root_cause, self.config.preview_ttl_minutes, apply.diff_preview,
                    );
                    let message = self
                        .synapse
                        .send("rtl.sop_preview", &body, Priority::Action, Some(&thread))
                        .await?;
                    record.synapse_msg_id = Some(message.id);
                    record.status = "preview".into();
                    // a preview is not a committed propagation; only the
                    // operator's approval makes it one
                    return Ok(false);
                }

                record.status = if apply.committed {
                    "committed".into()
                } else if apply.appended {
                    // appended but VCS commit failed; the file change is
                    // still a durable propagation
                    "committed_no_vcs".into()
                } else {
                    "skipped".into()
                };
                Ok(apply.appended)
            }

            PropagationType::Atom => {
                if !self.memories.atoms_table_exists()? {
                    record.status = "skipped".into();
                    return Ok(false);
                }
                let atom = Atom {
                    id: format!("atom-{}", event.id),
                    subject: format!("failure:{}:{}", event.failure_type, event.id.short(8)),
                    action: format!("triggered by {} in {}", event.root_cause, event.source),
                    outcome: format!(
                        "propagated to {}",
                        all_targets
                            .iter()
                            .map(|t| t.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    consequences: "regression armed".to_string(),
                    confidence: 0.8,
                    source: "learning".to_string(),
                    created_at: self.clock.epoch_ms(),
                    categories: Vec::new(),
                };
                self.memories.insert_atom(&atom)?;
                record.status = "committed".into();
                Ok(true)
            }

            PropagationType::RegressionTest => {
                let row = self.regression.generate(event)?;
                record.target_file = Some(row.file_path);
                record.status = "committed".into();
                Ok(true)
            }

            PropagationType::HookPattern => {
                let thread = format!("rtl:{}", event.id);
                let body = format!(
                    "New hook pattern candidate from {}: {}",
                    event.root_cause, event.failure_desc
                );
                let message = self
                    .synapse
                    .send("rtl.hook_pattern", &body, Priority::Info, Some(&thread))
                    .await?;
                record.synapse_msg_id = Some(message.id);
                record.status = "committed".into();
                Ok(true)
            }

            PropagationType::SynapseRelay | PropagationType::CrossSystem => {
                let subject = match target {
                    PropagationType::CrossSystem => "rtl.cross_system",
                    _ => "rtl.relay",
                };
                let thread = format!("rtl:{}", event.id);
                let message = self
                    .synapse
                    .send(subject, &event.failure_desc, Priority::Info, Some(&thread))
                    .await?;
                record.synapse_msg_id = Some(message.id);
                record.status = "committed".into();
                Ok(true)
            }
        }
    }

    /// A prior failure with the same root cause within the window means
    /// the original propagation didn't stick; escalate softly.
    async fn check_recurrence(&self, event: &mut FailureEvent) -> Result<(), LearnError> {
        let window_ms = u64::from(self.config.recurrence_window_days) * DAY_MS;
        let since = self.clock.epoch_ms().saturating_sub(window_ms);
        let priors = self
            .failures
            .find_by_root_cause_since(&event.root_cause, since, &event.id)?;
        if priors.is_empty() {
            return Ok(());
        }

        self.failures
            .record_recurrence(event, self.clock.epoch_ms())?;
        self.metrics.write_or_log(
            "rtl_recurrence",
            1.0,
            &format!("root_cause={}", event.root_cause),
        );

        let thread = format!("rtl:{}", event.id);
        let body = format!(
            "Root cause {} recurred ({} prior within {} days). \
             The earlier propagation didn't stick.",
            event.root_cause,
            priors.len(),
            self.config.recurrence_window_days,
        );
        if let Err(e) = self
            .synapse
            .send("rtl.recurrence", &body, Priority::Urgent, Some(&thread))
            .await
        {
            tracing::error!(failure = %event.id, error = %e, "recurrence alert delivery failed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
