// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters at the edge of the supervisory plane: probes, external
//! delivery channels, the cortex (model) client, and subprocess helpers.

mod channels;
mod cortex;
mod probe;
pub mod probes;
mod router;
mod similarity;
pub mod subprocess;

pub use channels::{CommandChannel, DesktopChannel};
pub use cortex::{CommandCortexAdapter, CortexAdapter, CortexError, CortexRequest, CortexResponse};
pub use probe::{DataSourceAdapter, MockSlot};
pub use router::{
    classify_cortex_error, CortexFailureKind, CortexRouter, RouteTelemetry, RouteType,
};
pub use similarity::{SimilarityModel, TokenOverlapModel};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCortexAdapter, FakeProbe};
