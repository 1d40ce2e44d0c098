// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Escalation router: four-tier policy from silent metric to urgent
//! dual-channel delivery.

use crate::error::HealingError;
use medulla_core::{Clock, IdGen, Incident, RunbookMode, Severity};
use medulla_storage::MetricsSink;
use medulla_synapse::{ExternalChannel, Priority, Synapse};
use std::sync::Arc;

/// Pure tier selection.
///
/// Tier 3: no runbook, failed remediation, or critical severity.
/// Tier 0: graduated runbook trusted above the confidence threshold.
/// Tier 1: graduated runbook, outcome uncertain (below threshold).
/// Tier 2: runbook exists but still needs approval (dry-run).
pub fn select_tier(
    runbook_exists: bool,
    runbook_mode: Option<RunbookMode>,
    confidence: f64,
    confidence_threshold: f64,
    remediation_failed: bool,
    severity: Severity,
) -> u8 {
    if !runbook_exists || remediation_failed || severity == Severity::Critical {
        return 3;
    }
    match runbook_mode {
        Some(RunbookMode::AutoExecute) if confidence >= confidence_threshold => 0,
        Some(RunbookMode::AutoExecute) => 1,
        _ => 2,
    }
}

/// Context the router needs to phrase and deliver an escalation.
#[derive(Debug, Clone)]
pub struct EscalationContext {
    pub runbook_id: Option<String>,
    pub runbook_mode: Option<RunbookMode>,
    pub confidence: f64,
    pub remediation_failed: bool,
    pub summary: String,
}

/// Delivers escalations per tier.
pub struct EscalationRouter<I: IdGen, C: Clock> {
    synapse: Synapse<I, C>,
    /// Guaranteed channel for tier 3, independent of bus delivery.
    guaranteed: Arc<dyn ExternalChannel>,
    metrics: MetricsSink,
    confidence_threshold: f64,
}

impl<I: IdGen, C: Clock> EscalationRouter<I, C> {
    pub fn new(
        synapse: Synapse<I, C>,
        guaranteed: Arc<dyn ExternalChannel>,
        metrics: MetricsSink,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            synapse,
            guaranteed,
            metrics,
            confidence_threshold,
        }
    }

    /// Route one incident outcome. Returns the tier fired.
    pub async fn route(
        &self,
        incident: &Incident,
        context: &EscalationContext,
    ) -> Result<u8, HealingError> {
        let tier = select_tier(
            context.runbook_id.is_some(),
            context.runbook_mode,
            context.confidence,
            self.confidence_threshold,
            context.remediation_failed,
            incident.severity,
        );

        let thread = format!("heal:{}", incident.id);
        let subject = format!(
            "heal.{} {} on {}",
            incident.anomaly_type, incident.severity, incident.target_id
        );

        self.metrics.write_or_log(
            "heal_escalation_fired",
            1.0,
            &format!("tier={tier},outcome=fired"),
        );

        match tier {
            0 => {
                // silent: the metric above is the whole delivery
                tracing::debug!(incident = %incident.id, "tier 0 escalation (silent)");
            }
            1 => {
                self.synapse
                    .send(&subject, &context.summary, Priority::Info, Some(&thread))
                    .await?;
            }
            2 => {
                let body = format!(
                    "{}\n\nRunbook {} needs approval (confidence {:.2}).\n\
                     Reply `approve {}` to execute or `dismiss {}` to suppress.",
                    context.summary,
                    context.runbook_id.as_deref().unwrap_or("?"),
                    context.confidence,
                    incident.id,
                    incident.id,
                );
                self.synapse
                    .send(&subject, &body, Priority::Action, Some(&thread))
                    .await?;
            }
            _ => {
                // dual delivery, concurrent; one path's failure must not
                // suppress the other
                let urgent_subject = format!("URGENT {subject}");
                let bus_send = self.synapse.send(
                    &urgent_subject,
                    &context.summary,
                    Priority::Urgent,
                    Some(&thread),
                );
                let guaranteed_message = medulla_synapse::SynapseMessage {
                    id: format!("guaranteed:{}", incident.id),
                    subject: urgent_subject.clone(),
                    body: context.summary.clone(),
                    priority: Priority::Urgent,
                    thread_id: Some(thread.clone()),
                    sent_at: incident.state_changed_at,
                };
                let guaranteed_send = self.guaranteed.deliver(&guaranteed_message);

                let (bus_result, guaranteed_result) = tokio::join!(bus_send, guaranteed_send);
                if let Err(e) = bus_result {
                    tracing::error!(incident = %incident.id, error = %e, "tier 3 bus delivery failed");
                    self.metrics
                        .write_or_log("heal_escalation_bus_failed", 1.0, "tier=3");
                }
                if let Err(e) = guaranteed_result {
                    tracing::error!(
                        incident = %incident.id,
                        channel = self.guaranteed.name(),
                        error = %e,
                        "tier 3 guaranteed delivery failed"
                    );
                    self.metrics
                        .write_or_log("heal_escalation_guaranteed_failed", 1.0, "tier=3");
                }
            }
        }
        Ok(tier)
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
