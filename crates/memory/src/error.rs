// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for compression and matching.

use thiserror::Error;

/// Errors raised by the compression pipeline.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("storage error: {0}")]
    Storage(#[from] medulla_storage::StoreError),
    #[error("cortex error: {0}")]
    Cortex(#[from] medulla_adapters::CortexError),
    #[error("distillation returned invalid JSON: {0}")]
    BadJson(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("path rejected: {0}")]
    Path(#[from] medulla_core::SanitizeError),
}
