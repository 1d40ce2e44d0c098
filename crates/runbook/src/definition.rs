// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runbook definition capability set.

use crate::step::Step;
use medulla_core::{Anomaly, AnomalyType};

/// A static runbook: identity, applicability, and a step builder.
///
/// Definitions are code, registered at startup; persisted state about a
/// runbook (dry-run counter, confidence, mode) lives in storage.
pub trait RunbookDefinition: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn label(&self) -> &str;

    /// Anomaly types this runbook remediates.
    fn applies_to(&self) -> &[AnomalyType];

    /// Whether the operator may put this runbook on the auto-execute
    /// whitelist at all. Definitions with destructive steps say no and
    /// stay dry-run forever.
    fn auto_approve_whitelist(&self) -> bool;

    /// Build the ordered step sequence for a concrete anomaly.
    fn build(&self, anomaly: &Anomaly) -> Vec<Step>;

    fn applies_to_type(&self, anomaly_type: AnomalyType) -> bool {
        self.applies_to().contains(&anomaly_type)
    }
}
