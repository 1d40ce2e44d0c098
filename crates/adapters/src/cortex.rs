// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cortex adapter: the boundary to whatever serves model completions.
//!
//! The plane is not an LLM client; prompt templates and transport live
//! outside. This trait is the seam the distiller and router inject.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// One completion request.
#[derive(Debug, Clone)]
pub struct CortexRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

/// One completion response.
#[derive(Debug, Clone)]
pub struct CortexResponse {
    pub text: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// Errors from the model boundary, shaped for pure classification.
#[derive(Debug, Error)]
pub enum CortexError {
    #[error("request timed out after {0}ms")]
    Timeout(u64),
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("capacity exhausted: {0}")]
    Capacity(String),
    #[error("request rejected by policy: {0}")]
    PolicyRejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Serves completions.
#[async_trait]
pub trait CortexAdapter: Send + Sync + 'static {
    async fn complete(&self, request: &CortexRequest) -> Result<CortexResponse, CortexError>;
}

/// Adapter that pipes the prompt to a configured list-form command.
///
/// The command receives the model name as its final argument and the
/// prompt on stdin; it prints the completion on stdout.
pub struct CommandCortexAdapter {
    argv: Vec<String>,
}

impl CommandCortexAdapter {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl CortexAdapter for CommandCortexAdapter {
    async fn complete(&self, request: &CortexRequest) -> Result<CortexResponse, CortexError> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| CortexError::Transport("empty cortex argv".into()))?;

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .arg(&request.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CortexError::Transport(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.prompt.as_bytes())
                .await
                .map_err(|e| CortexError::Transport(e.to_string()))?;
        }

        let timeout = Duration::from_millis(request.timeout_ms);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(CortexError::Transport(e.to_string())),
            Err(_) => return Err(CortexError::Timeout(request.timeout_ms)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CortexError::Provider {
                status: 500,
                message: stderr.trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(CortexResponse {
            tokens_in: request.prompt.split_whitespace().count() as u64,
            tokens_out: text.split_whitespace().count() as u64,
            model: request.model.clone(),
            text,
        })
    }
}

#[cfg(test)]
#[path = "cortex_tests.rs"]
mod tests;
