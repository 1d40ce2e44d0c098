// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! medullad: the supervisory-plane daemon.

use medulla_daemon::{Daemon, DaemonConfig, LifecycleError, Paths};
use tracing_subscriber::EnvFilter;

fn init_tracing(paths: &Paths) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = paths.log_path.parent()?;
    let file_name = paths.log_path.file_name()?;
    let appender = tracing_appender::rolling::never(log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<(), LifecycleError> {
    let paths = Paths::default_user().ok_or_else(|| {
        LifecycleError::Io(std::io::Error::other("no home directory for state layout"))
    })?;
    std::fs::create_dir_all(&paths.state_dir)?;
    let _log_guard = init_tracing(&paths);

    let daemon = Daemon::start(paths, DaemonConfig::default()).await?;
    tracing::info!("medullad ready; waiting for shutdown signal");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "signal wait failed, shutting down");
    }
    daemon.stop().await;
    Ok(())
}
