// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Real-Time Learning pipeline: failure detection relays, a bounded
//! queue, classification, propagation fan-out, and recurrence tracking.

mod classifier;
mod error;
mod pipeline;
mod queue;
mod regression;
mod relays;
mod sop;

pub use classifier::{default_failure_rules, FailureClassifier, FailureRule};
pub use error::LearnError;
pub use pipeline::LearningPipeline;
pub use queue::{detection_queue, run_drain_loop, DetectionQueue};
pub use regression::RegressionGenerator;
pub use relays::{
    strip_markup, CorrectionScanner, HookViolationRelay, PipelineFailRelay, ToolMonitor,
    TrustEventRelay,
};
pub use sop::{SopApply, SopPatcher};
