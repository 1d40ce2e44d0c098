// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The five detection relays.
//!
//! Every relay ends in a non-suspending `enqueue`; relays are safe to
//! call from the host agent's event handlers.

use crate::queue::DetectionQueue;
use medulla_core::{Clock, DetectionPayload, FailureType, Tier};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;

/// Bound on the remembered tool-call window.
const RECENT_TOOL_CALLS: usize = 32;

/// Enqueues on tool exit ≠ 0 or exception; ignores success.
#[derive(Clone)]
pub struct ToolMonitor {
    queue: DetectionQueue,
}

impl ToolMonitor {
    pub fn new(queue: DetectionQueue) -> Self {
        Self { queue }
    }

    pub fn on_tool_result(
        &self,
        tool_name: &str,
        exit_code: i32,
        stderr: &str,
        raw_input: Option<&str>,
    ) {
        if exit_code == 0 {
            return;
        }
        self.queue.enqueue(DetectionPayload {
            failure_type: FailureType::ToolErr,
            tier: Tier::T1,
            source: "tool_monitor".into(),
            context: json!({ "tool_name": tool_name, "exit_code": exit_code }),
            raw_input: raw_input.map(str::to_string),
            failure_desc: format!("{tool_name} exited {exit_code}: {}", stderr.trim()),
        });
    }

    pub fn on_tool_exception(&self, tool_name: &str, message: &str, raw_input: Option<&str>) {
        self.queue.enqueue(DetectionPayload {
            failure_type: FailureType::ToolErr,
            tier: Tier::T1,
            source: "tool_monitor".into(),
            context: json!({ "tool_name": tool_name, "exception": true }),
            raw_input: raw_input.map(str::to_string),
            failure_desc: format!("{tool_name} raised: {message}"),
        });
    }
}

/// Strip fenced code blocks and quoted lines before keyword scanning.
pub fn strip_markup(text: &str) -> String {
    let mut out = Vec::new();
    let mut in_fence = false;
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || line.trim_start().starts_with('>') {
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

#[derive(Debug, Clone)]
struct ToolCall {
    tool_name: String,
    raw_input: Option<String>,
    at_ms: u64,
}

/// Scans user messages for correction keywords and binds matches to the
/// most recent tool call within the window.
pub struct CorrectionScanner<C: Clock> {
    queue: DetectionQueue,
    keywords: Vec<String>,
    window_ms: u64,
    recent: Mutex<VecDeque<ToolCall>>,
    clock: C,
}

impl<C: Clock> CorrectionScanner<C> {
    pub fn new(queue: DetectionQueue, keywords: Vec<String>, window_ms: u64, clock: C) -> Self {
        Self {
            queue,
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            window_ms,
            recent: Mutex::new(VecDeque::new()),
            clock,
        }
    }

    /// Record a tool call so a later correction can bind to it.
    pub fn note_tool_call(&self, tool_name: &str, raw_input: Option<&str>) {
        let mut recent = self.recent.lock();
        recent.push_back(ToolCall {
            tool_name: tool_name.to_string(),
            raw_input: raw_input.map(str::to_string),
            at_ms: self.clock.epoch_ms(),
        });
        while recent.len() > RECENT_TOOL_CALLS {
            recent.pop_front();
        }
    }

    /// Scan one user message. Returns the matched keyword, if any.
    pub fn on_user_message(&self, text: &str) -> Option<String> {
        let stripped = strip_markup(text).to_lowercase();
        // the longest matching keyword wins ("wrong path" over "wrong")
        let keyword = self
            .keywords
            .iter()
            .filter(|k| stripped.contains(k.as_str()))
            .max_by_key(|k| k.len())?
            .clone();

        let now = self.clock.epoch_ms();
        let bound = {
            let recent = self.recent.lock();
            recent
                .iter()
                .rev()
                .find(|call| now.saturating_sub(call.at_ms) <= self.window_ms)
                .cloned()
        }?;

        self.queue.enqueue(DetectionPayload {
            failure_type: FailureType::Correct,
            tier: Tier::T2,
            source: "correction_scanner".into(),
            context: json!({
                "tool_name": bound.tool_name,
                "matched_keyword": keyword,
            }),
            raw_input: bound.raw_input,
            failure_desc: strip_markup(text).trim().to_string(),
        });
        Some(keyword)
    }

    /// Clear the tool-call window (test isolation).
    pub fn reset(&self) {
        self.recent.lock().clear();
    }
}

/// Consumes events from the external pre-action SOP hooks. Tier 2.
#[derive(Clone)]
pub struct HookViolationRelay {
    queue: DetectionQueue,
}

impl HookViolationRelay {
    pub fn new(queue: DetectionQueue) -> Self {
        Self { queue }
    }

    pub fn on_violation(&self, hook: &str, rule: &str, detail: &str) {
        self.queue.enqueue(DetectionPayload {
            failure_type: FailureType::SopViol,
            tier: Tier::T2,
            source: "hook_relay".into(),
            context: json!({ "hook": hook, "rule": rule }),
            raw_input: None,
            failure_desc: format!("SOP violation {rule} in {hook}: {detail}"),
        });
    }
}

/// Trust demotion events. Tier 3.
#[derive(Clone)]
pub struct TrustEventRelay {
    queue: DetectionQueue,
}

impl TrustEventRelay {
    pub fn new(queue: DetectionQueue) -> Self {
        Self { queue }
    }

    pub fn on_demotion(&self, subject: &str, from_tier: u8, to_tier: u8, reason: &str) {
        self.queue.enqueue(DetectionPayload {
            failure_type: FailureType::TrustDem,
            tier: Tier::T3,
            source: "trust_relay".into(),
            context: json!({ "subject": subject, "from": from_tier, "to": to_tier }),
            raw_input: None,
            failure_desc: format!("{subject} demoted {from_tier}→{to_tier}: {reason}"),
        });
    }
}

/// Pipeline stage failures. Tier 3.
#[derive(Clone)]
pub struct PipelineFailRelay {
    queue: DetectionQueue,
}

impl PipelineFailRelay {
    pub fn new(queue: DetectionQueue) -> Self {
        Self { queue }
    }

    pub fn on_stage_failed(&self, pipeline: &str, stage: &str, error: &str) {
        self.queue.enqueue(DetectionPayload {
            failure_type: FailureType::PipeFail,
            tier: Tier::T3,
            source: "pipeline_relay".into(),
            context: json!({ "pipeline": pipeline, "stage": stage }),
            raw_input: None,
            failure_desc: format!("pipeline {pipeline} stage {stage} failed: {error}"),
        });
    }
}

#[cfg(test)]
#[path = "relays_tests.rs"]
mod tests;
