// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in runbooks.

use crate::definition::RunbookDefinition;
use crate::registry::RunbookRegistry;
use crate::step::Step;
use medulla_core::{Anomaly, AnomalyType};
use std::sync::Arc;

const KILL_TIMEOUT_MS: u64 = 10_000;
const START_TIMEOUT_MS: u64 = 30_000;
const VERIFY_TIMEOUT_MS: u64 = 10_000;
const CLEANUP_TIMEOUT_MS: u64 = 120_000;

/// Registry pre-loaded with every built-in runbook.
pub fn builtin_runbooks() -> RunbookRegistry {
    let mut registry = RunbookRegistry::new();
    registry.register(Arc::new(RestartService));
    registry.register(Arc::new(GatewayRestart));
    registry.register(Arc::new(DiskCleanup));
    registry
}

/// Kill, restart, and verify a supervised service.
pub struct RestartService;

impl RunbookDefinition for RestartService {
    fn id(&self) -> &str {
        "rb-restart-service"
    }

    fn label(&self) -> &str {
        "Restart dead service"
    }

    fn applies_to(&self) -> &[AnomalyType] {
        &[AnomalyType::ProcessDead, AnomalyType::ProcessFlapping]
    }

    fn auto_approve_whitelist(&self) -> bool {
        true
    }

    fn build(&self, anomaly: &Anomaly) -> Vec<Step> {
        let service = anomaly.target_id.clone();
        vec![
            Step::command(
                "kill-old",
                format!("Stop any lingering {service} process"),
                format!("Would send SIGTERM to {service} via pkill -x"),
                vec!["pkill".into(), "-x".into(), service.clone()],
                KILL_TIMEOUT_MS,
            )
            .with_untrusted(vec![service.clone()]),
            Step::command(
                "start-service",
                format!("Start {service} under the user service manager"),
                format!("Would run systemctl --user start {service}"),
                vec![
                    "systemctl".into(),
                    "--user".into(),
                    "start".into(),
                    service.clone(),
                ],
                START_TIMEOUT_MS,
            )
            .with_untrusted(vec![service.clone()]),
            Step::command(
                "verify-pid",
                format!("Confirm {service} has a live pid"),
                format!("Would check pgrep -x {service}"),
                vec!["pgrep".into(), "-x".into(), service.clone()],
                VERIFY_TIMEOUT_MS,
            )
            .with_untrusted(vec![service]),
        ]
    }
}

/// Bounce the external message gateway service.
pub struct GatewayRestart;

impl RunbookDefinition for GatewayRestart {
    fn id(&self) -> &str {
        "rb-gateway-restart"
    }

    fn label(&self) -> &str {
        "Restart unreachable gateway"
    }

    fn applies_to(&self) -> &[AnomalyType] {
        &[AnomalyType::GatewayUnreachable, AnomalyType::GatewayDegraded]
    }

    fn auto_approve_whitelist(&self) -> bool {
        true
    }

    fn build(&self, anomaly: &Anomaly) -> Vec<Step> {
        let gateway = anomaly.target_id.clone();
        vec![
            Step::command(
                "restart-gateway",
                format!("Restart gateway service {gateway}"),
                format!("Would run systemctl --user restart {gateway}"),
                vec![
                    "systemctl".into(),
                    "--user".into(),
                    "restart".into(),
                    gateway.clone(),
                ],
                START_TIMEOUT_MS,
            )
            .with_untrusted(vec![gateway.clone()]),
            Step::command(
                "verify-gateway",
                format!("Confirm {gateway} is active"),
                format!("Would check systemctl --user is-active {gateway}"),
                vec![
                    "systemctl".into(),
                    "--user".into(),
                    "is-active".into(),
                    gateway.clone(),
                ],
                VERIFY_TIMEOUT_MS,
            )
            .with_untrusted(vec![gateway]),
        ]
    }
}

/// Reclaim disk space on a full filesystem.
///
/// Deliberately not whitelistable: the cleanup deletes files.
pub struct DiskCleanup;

impl RunbookDefinition for DiskCleanup {
    fn id(&self) -> &str {
        "rb-disk-cleanup"
    }

    fn label(&self) -> &str {
        "Reclaim disk space"
    }

    fn applies_to(&self) -> &[AnomalyType] {
        &[AnomalyType::DiskFull]
    }

    fn auto_approve_whitelist(&self) -> bool {
        false
    }

    fn build(&self, _anomaly: &Anomaly) -> Vec<Step> {
        vec![
            Step::command(
                "vacuum-journal",
                "Trim the systemd journal to 200M",
                "Would run journalctl --vacuum-size=200M",
                vec!["journalctl".into(), "--vacuum-size=200M".into()],
                CLEANUP_TIMEOUT_MS,
            ),
            Step::command(
                "prune-tmp",
                "Delete week-old files from /tmp",
                "Would delete /tmp files older than 7 days",
                vec![
                    "find".into(),
                    "/tmp".into(),
                    "-maxdepth".into(),
                    "1".into(),
                    "-type".into(),
                    "f".into(),
                    "-mtime".into(),
                    "+7".into(),
                    "-delete".into(),
                ],
                CLEANUP_TIMEOUT_MS,
            ),
        ]
    }
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
