// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the healing engine.

use thiserror::Error;

/// Errors that can occur in the healing engine.
#[derive(Debug, Error)]
pub enum HealingError {
    #[error("storage error: {0}")]
    Storage(#[from] medulla_storage::StoreError),
    #[error("bus error: {0}")]
    Bus(#[from] medulla_synapse::SynapseError),
    #[error("incident not found: {0}")]
    IncidentNotFound(String),
}
