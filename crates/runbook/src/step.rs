// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook steps.

use async_trait::async_trait;
use medulla_core::{is_safe_token, Anomaly};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
}

/// Result of executing (or dry-running) one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub status: StepStatus,
    pub output: String,
    /// Paths or identifiers the step produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Success,
            output: output.into(),
            artifacts: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failed,
            output: output.into(),
            artifacts: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Context a step executes against.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub anomaly: Anomaly,
    pub incident_id: String,
    pub vars: HashMap<String, String>,
}

/// Custom step body.
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(&self, context: &StepContext) -> StepResult;
}

/// Adapter turning a plain closure into a [`StepRunner`] (tests, simple
/// in-process remediations).
pub struct FnStepRunner<F>(pub F);

#[async_trait]
impl<F> StepRunner for FnStepRunner<F>
where
    F: Fn(&StepContext) -> StepResult + Send + Sync,
{
    async fn run(&self, context: &StepContext) -> StepResult {
        (self.0)(context)
    }
}

/// What a step does when run live.
#[derive(Clone)]
pub enum StepAction {
    /// List-form external command. Never passes through a shell.
    Command { argv: Vec<String> },
    /// In-process body.
    Custom(Arc<dyn StepRunner>),
}

/// One ordered step of a runbook.
#[derive(Clone)]
pub struct Step {
    pub id: String,
    pub description: String,
    pub timeout_ms: u64,
    /// Pure description of what live mode would do.
    pub dry_run: String,
    pub action: StepAction,
    /// Raw untrusted inputs interpolated into the action; every one must
    /// pass the safe-token predicate before the action runs.
    pub untrusted_inputs: Vec<String>,
}

impl Step {
    pub fn command(
        id: impl Into<String>,
        description: impl Into<String>,
        dry_run: impl Into<String>,
        argv: Vec<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            timeout_ms,
            dry_run: dry_run.into(),
            action: StepAction::Command { argv },
            untrusted_inputs: Vec::new(),
        }
    }

    pub fn custom(
        id: impl Into<String>,
        description: impl Into<String>,
        dry_run: impl Into<String>,
        runner: Arc<dyn StepRunner>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            timeout_ms,
            dry_run: dry_run.into(),
            action: StepAction::Custom(runner),
            untrusted_inputs: Vec::new(),
        }
    }

    /// Mark raw inputs that must pass validation before execution.
    pub fn with_untrusted(mut self, inputs: Vec<String>) -> Self {
        self.untrusted_inputs = inputs;
        self
    }

    /// Gate that runs before any external invocation. Returns the
    /// rejection result for the first unsafe input, if any.
    pub fn validate_inputs(&self) -> Option<StepResult> {
        for input in &self.untrusted_inputs {
            if !is_safe_token(input) {
                return Some(StepResult::failed(format!(
                    "Rejected unsafe input {input:?} for step {}",
                    self.id
                )));
            }
        }
        None
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("timeout_ms", &self.timeout_ms)
            .field(
                "action",
                &match &self.action {
                    StepAction::Command { argv } => format!("command {argv:?}"),
                    StepAction::Custom(_) => "custom".to_string(),
                },
            )
            .finish()
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
