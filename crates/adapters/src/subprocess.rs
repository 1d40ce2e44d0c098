// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers.
//!
//! All external invocations are list-form (`argv[0]` + args); nothing is
//! ever passed through a shell.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for probe commands (pgrep, df, health checks).
pub const PROBE_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for VCS operations in the SOP patcher.
pub const VCS_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a list-form command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_argv(
    argv: &[String],
    cwd: Option<&std::path::Path>,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| format!("{description}: empty argv"))?;
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// Stdout of a successful run, trimmed; errors carry stderr.
pub async fn run_argv_stdout(
    argv: &[String],
    timeout: Duration,
    description: &str,
) -> Result<String, String> {
    let output = run_argv(argv, None, timeout, description).await?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(format!(
            "{} exited {}: {}",
            description,
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
