// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared cortex router: deterministic model selection with an ordered
//! fallback chain and per-attempt telemetry.

use crate::cortex::{CortexAdapter, CortexError, CortexRequest, CortexResponse};
use medulla_core::{Clock, CortexConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// How the selected model was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    UserOverride,
    TaskPolicy,
    SystemDefault,
    Fallback,
}

/// Failure classes derived from standard error signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CortexFailureKind {
    Timeout,
    Provider5xx,
    Capacity,
    PolicyOverride,
}

/// Classify a thrown error into its failure class. Pure.
pub fn classify_cortex_error(error: &CortexError) -> CortexFailureKind {
    match error {
        CortexError::Timeout(_) => CortexFailureKind::Timeout,
        CortexError::Provider { status, .. } if (500u16..600).contains(status) => {
            CortexFailureKind::Provider5xx
        }
        CortexError::Provider { message, .. } | CortexError::Transport(message)
            if message.contains("overloaded") || message.contains("capacity") =>
        {
            CortexFailureKind::Capacity
        }
        CortexError::Capacity(_) => CortexFailureKind::Capacity,
        CortexError::PolicyRejected(_) => CortexFailureKind::PolicyOverride,
        // remaining provider/transport failures route like 5xx
        _ => CortexFailureKind::Provider5xx,
    }
}

/// One telemetry event per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTelemetry {
    pub selected_model: String,
    pub route_type: RouteType,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Deterministic model-selection router.
pub struct CortexRouter<A: CortexAdapter, C: Clock> {
    adapter: Arc<A>,
    config: CortexConfig,
    clock: C,
    telemetry: Option<mpsc::UnboundedSender<RouteTelemetry>>,
}

impl<A: CortexAdapter, C: Clock> CortexRouter<A, C> {
    pub fn new(adapter: Arc<A>, config: CortexConfig, clock: C) -> Self {
        Self {
            adapter,
            config,
            clock,
            telemetry: None,
        }
    }

    /// Attach a telemetry sink; one event fires per attempt.
    pub fn with_telemetry(mut self, tx: mpsc::UnboundedSender<RouteTelemetry>) -> Self {
        self.telemetry = Some(tx);
        self
    }

    /// The candidate chain: override, else task policy, else system
    /// default; then the ordered fallback list, deduplicated.
    pub fn candidates(&self, task_kind: &str, user_override: Option<&str>) -> Vec<(String, RouteType)> {
        let primary = match user_override {
            Some(model) => (model.to_string(), RouteType::UserOverride),
            None => match self.config.task_policies.get(task_kind) {
                Some(model) => (model.clone(), RouteType::TaskPolicy),
                None => (self.config.default_model.clone(), RouteType::SystemDefault),
            },
        };
        let mut chain = vec![primary];
        for model in &self.config.fallback_models {
            if chain.iter().all(|(m, _)| m != model) {
                chain.push((model.clone(), RouteType::Fallback));
            }
        }
        chain
    }

    /// Complete a prompt, walking the chain under the attempt budget.
    pub async fn complete(
        &self,
        task_kind: &str,
        user_override: Option<&str>,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<CortexResponse, CortexError> {
        let chain = self.candidates(task_kind, user_override);
        let budget = self.config.attempt_budget.max(1) as usize;
        let mut last_error = CortexError::Transport("no models in chain".into());

        for (attempt, (model, route_type)) in chain.into_iter().take(budget).enumerate() {
            let request = CortexRequest {
                model: model.clone(),
                prompt: prompt.to_string(),
                max_tokens,
                timeout_ms: self.config.request_timeout_ms,
            };
            let start = self.clock.now();
            let result = self.adapter.complete(&request).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(response) => {
                    self.emit(RouteTelemetry {
                        selected_model: model,
                        route_type,
                        tokens_in: response.tokens_in,
                        tokens_out: response.tokens_out,
                        duration_ms,
                        success: true,
                        fallback_reason: None,
                    });
                    return Ok(response);
                }
                Err(error) => {
                    let kind = classify_cortex_error(&error);
                    tracing::warn!(
                        model = %request.model,
                        attempt,
                        kind = ?kind,
                        error = %error,
                        "cortex attempt failed"
                    );
                    self.emit(RouteTelemetry {
                        selected_model: request.model,
                        route_type,
                        tokens_in: 0,
                        tokens_out: 0,
                        duration_ms,
                        success: false,
                        fallback_reason: Some(format!("{kind:?}")),
                    });
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }

    fn emit(&self, event: RouteTelemetry) {
        if let Some(tx) = &self.telemetry {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
