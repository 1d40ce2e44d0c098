// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Knowledge compression (atom engine), cross-domain pattern matching,
//! and cross-session context preservation.

mod archive;
mod cluster;
mod crossdomain;
mod distill;
mod enrich;
mod error;
mod report;
mod run;
mod session;

pub use archive::{ArchiveWriter, CompressedWrite};
pub use cluster::ClusterFinder;
pub use crossdomain::{
    CrossDomainMatcher, Extractor, ExternalDbExtractor, GenericExtractor, PatternMatch,
    vector_from_text,
};
pub use distill::{Distillation, Distiller};
pub use enrich::AtomEnricher;
pub use error::CompressError;
pub use report::CompressionReport;
pub use run::CompressionRun;
pub use session::{
    active_projects, decay_factor, hot_topics, relevance_score, Preamble, SessionPreserver,
};
