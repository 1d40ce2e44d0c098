// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded detection queue with a single drain loop.
//!
//! `enqueue` is synchronous and never suspends; relays call it from hot
//! paths (tool-result handlers) and must return in under a millisecond.

use crate::error::LearnError;
use crate::pipeline::LearningPipeline;
use medulla_core::{Clock, DetectionPayload, IdGen};
use tokio::sync::{mpsc, watch};

/// Sender half handed to the relays.
#[derive(Clone)]
pub struct DetectionQueue {
    tx: mpsc::Sender<DetectionPayload>,
}

impl DetectionQueue {
    /// Enqueue a detection. Returns false when the queue is full; the
    /// detection is dropped and logged, never blocked on.
    pub fn enqueue(&self, payload: DetectionPayload) -> bool {
        match self.tx.try_send(payload) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(payload)) => {
                tracing::error!(
                    failure_type = %payload.failure_type,
                    source = %payload.source,
                    "detection queue full, dropping detection"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::error!("detection queue closed");
                false
            }
        }
    }

    /// Current free capacity (diagnostics).
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Build a queue pair with the configured bound.
pub fn detection_queue(capacity: usize) -> (DetectionQueue, mpsc::Receiver<DetectionPayload>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DetectionQueue { tx }, rx)
}

/// The single drain loop. Handler errors are logged and never stop the
/// loop; no detection is silently dropped once dequeued (a failed one
/// still leaves its persisted failure row behind, or at minimum a log
/// line).
pub async fn run_drain_loop<I: IdGen, C: Clock>(
    mut rx: mpsc::Receiver<DetectionPayload>,
    pipeline: std::sync::Arc<LearningPipeline<I, C>>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("detection drain loop started");
    loop {
        tokio::select! {
            maybe = rx.recv() => {
                let Some(payload) = maybe else {
                    tracing::info!("detection queue closed, drain loop exiting");
                    return;
                };
                match pipeline.process(payload).await {
                    Ok(event) => {
                        tracing::debug!(failure = %event.id, status = %event.propagation_status, "detection processed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "detection processing failed");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("drain loop stopping");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
