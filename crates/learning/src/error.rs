// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the learning pipeline.

use thiserror::Error;

/// Errors that can occur while learning from failures.
#[derive(Debug, Error)]
pub enum LearnError {
    #[error("storage error: {0}")]
    Storage(#[from] medulla_storage::StoreError),
    #[error("bus error: {0}")]
    Bus(#[from] medulla_synapse::SynapseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("path rejected: {0}")]
    Path(#[from] medulla_core::SanitizeError),
}
