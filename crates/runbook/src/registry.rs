// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook registry: lookup by id or by anomaly.

use crate::definition::RunbookDefinition;
use indexmap::IndexMap;
use medulla_core::Anomaly;
use std::sync::Arc;

/// Ordered registry of runbook definitions. Registration order is the
/// tie-break when several runbooks apply to the same anomaly type.
#[derive(Default, Clone)]
pub struct RunbookRegistry {
    definitions: IndexMap<String, Arc<dyn RunbookDefinition>>,
}

impl RunbookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: Arc<dyn RunbookDefinition>) {
        let id = definition.id().to_string();
        if self.definitions.insert(id.clone(), definition).is_some() {
            tracing::warn!(runbook = %id, "runbook re-registered, replacing");
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn RunbookDefinition>> {
        self.definitions.get(id).cloned()
    }

    /// Pick the runbook for an anomaly: an applicable remediation hint
    /// wins, else the first registered applicable definition.
    pub fn find_for(&self, anomaly: &Anomaly) -> Option<Arc<dyn RunbookDefinition>> {
        if let Some(hint) = &anomaly.remediation_hint {
            if let Some(definition) = self.get(hint) {
                if definition.applies_to_type(anomaly.anomaly_type) {
                    return Some(definition);
                }
                tracing::warn!(
                    hint = %hint,
                    anomaly_type = %anomaly.anomaly_type,
                    "remediation hint does not apply to anomaly type, ignoring"
                );
            }
        }
        self.definitions
            .values()
            .find(|d| d.applies_to_type(anomaly.anomaly_type))
            .cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
