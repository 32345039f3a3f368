// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with timeouts and log forwarding.

use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Make invocations and other local toolchain steps (elaboration can be slow).
pub const TOOLCHAIN_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);

/// Vendor place-and-route on a build host.
pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// A single rsync transfer.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Short remote commands (`mkdir -p`, package installs).
pub const REMOTE_COMMAND_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Cloud provider CLI calls other than uploads.
pub const CLOUD_CLI_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Archive upload to object storage.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Notification delivery.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to spawn {desc}: {source}")]
    Spawn {
        desc: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{desc} timed out after {}s", timeout.as_secs())]
    TimedOut { desc: String, timeout: Duration },
    #[error("{desc} i/o error: {source}")]
    Io {
        desc: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where streamed output lines are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Info,
    Debug,
}

/// Run `cmd` to completion and capture its output.
///
/// The child is killed if the timeout elapses or the future is dropped.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    desc: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Spawn { desc: desc.to_string(), source }),
        Err(_) => Err(SubprocessError::TimedOut { desc: desc.to_string(), timeout }),
    }
}

/// Run `cmd`, forwarding each stdout/stderr line to tracing, and return the
/// exit code (`-1` when killed by a signal).
///
/// Used for long-running toolchain steps whose output is too large to buffer.
pub async fn run_streamed(
    mut cmd: Command,
    timeout: Duration,
    desc: &str,
    echo: Echo,
) -> Result<i32, SubprocessError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    let mut child =
        cmd.spawn().map_err(|source| SubprocessError::Spawn { desc: desc.to_string(), source })?;

    let stdout = child.stdout.take().map(|out| tokio::spawn(forward_lines(out, desc.to_string(), echo)));
    let stderr = child.stderr.take().map(|err| tokio::spawn(forward_lines(err, desc.to_string(), echo)));

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => return Err(SubprocessError::Io { desc: desc.to_string(), source }),
        Err(_) => {
            let _ = child.kill().await;
            return Err(SubprocessError::TimedOut { desc: desc.to_string(), timeout });
        }
    };

    for task in [stdout, stderr].into_iter().flatten() {
        let _ = task.await;
    }
    Ok(status.code().unwrap_or(-1))
}

async fn forward_lines<R>(reader: R, desc: String, echo: Echo)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match echo {
            Echo::Info => tracing::info!(target: "fab::output", cmd = %desc, "{}", line),
            Echo::Debug => tracing::debug!(target: "fab::output", cmd = %desc, "{}", line),
        }
    }
}

/// Quote `s` for inclusion in a POSIX shell command line.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Trimmed stderr, or a placeholder when the command printed nothing.
pub fn stderr_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "(no stderr)".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
