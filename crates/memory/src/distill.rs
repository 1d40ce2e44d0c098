// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distiller: LLM-assisted compression with a hard ratio floor.
//!
//! A ratio below the floor is a policy refusal, expressed as `Ok(None)`;
//! malformed model output is an error the run records and survives.

use crate::error::CompressError;
use medulla_adapters::{CortexAdapter, CortexRouter};
use medulla_core::{token_count, Clock, Cluster, CompressionConfig, MemoryRecord};
use serde::{Deserialize, Serialize};

const DISTILL_TASK: &str = "distill";
const MAX_TOKENS: u32 = 512;

/// Validated distillation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distillation {
    pub abstraction: String,
    /// Recomputed from actual token counts, not the model's claim.
    pub compression_ratio: f64,
    pub is_causal: bool,
}

/// Shape the model must answer with.
#[derive(Debug, Deserialize)]
struct RawDistillation {
    abstraction: String,
    #[allow(dead_code)]
    compression_ratio: f64,
    is_causal: bool,
}

/// Compresses clusters through the cortex router.
pub struct Distiller<A: CortexAdapter, C: Clock> {
    router: CortexRouter<A, C>,
    config: CompressionConfig,
}

impl<A: CortexAdapter, C: Clock> Distiller<A, C> {
    pub fn new(router: CortexRouter<A, C>, config: CompressionConfig) -> Self {
        Self { router, config }
    }

    fn prompt(cluster: &Cluster, members: &[MemoryRecord]) -> String {
        let mut prompt = String::from(
            "Compress the following related memories into one abstraction.\n\
             Answer with strict JSON: {\"abstraction\": string, \
             \"compression_ratio\": number, \"is_causal\": boolean}.\n\n",
        );
        prompt.push_str(&format!("Dominant category: {}\n\n", cluster.dominant_category));
        for member in members {
            prompt.push_str(&format!("- [{}] {}\n", member.id, member.content));
        }
        prompt
    }

    /// Distill one cluster. `Ok(None)` means the ratio floor refused it.
    pub async fn distill(
        &self,
        cluster: &Cluster,
        members: &[MemoryRecord],
    ) -> Result<Option<Distillation>, CompressError> {
        let prompt = Self::prompt(cluster, members);
        let response = self
            .router
            .complete(DISTILL_TASK, None, &prompt, MAX_TOKENS)
            .await?;

        let raw = parse_distillation(&response.text)?;

        let source_tokens: usize = members.iter().map(|m| token_count(&m.content)).sum();
        let abstraction_tokens = token_count(&raw.abstraction).max(1);
        let ratio = source_tokens as f64 / abstraction_tokens as f64;

        if ratio < self.config.min_compression_ratio {
            tracing::info!(
                cluster = %cluster.cluster_id,
                ratio,
                floor = self.config.min_compression_ratio,
                "distillation refused below ratio floor"
            );
            return Ok(None);
        }

        Ok(Some(Distillation {
            abstraction: raw.abstraction,
            compression_ratio: ratio,
            is_causal: raw.is_causal,
        }))
    }
}

/// Strict JSON validation; tolerates surrounding prose by extracting the
/// outermost object.
fn parse_distillation(text: &str) -> Result<RawDistillation, CompressError> {
    let trimmed = text.trim();
    let candidate = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let start = trimmed
            .find('{')
            .ok_or_else(|| CompressError::BadJson("no JSON object in response".into()))?;
        let end = trimmed
            .rfind('}')
            .ok_or_else(|| CompressError::BadJson("unterminated JSON object".into()))?;
        trimmed[start..=end].to_string()
    };
    let raw: RawDistillation =
        serde_json::from_str(&candidate).map_err(|e| CompressError::BadJson(e.to_string()))?;
    if raw.abstraction.trim().is_empty() {
        return Err(CompressError::BadJson("empty abstraction".into()));
    }
    Ok(raw)
}

#[cfg(test)]
#[path = "distill_tests.rs"]
mod tests;
