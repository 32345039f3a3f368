// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution on build hosts over SSH.

use async_trait::async_trait;
use fab_core::{HostAddr, HostKeyPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::env::CommandEnv;
use crate::subprocess::{run_streamed, shell_quote, Echo, SubprocessError};

/// ssh reserves this exit status for its own failures.
const SSH_TRANSPORT_FAILURE: i32 = 255;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("cannot reach {host}: ssh exited with {code}")]
    Transport { host: HostAddr, code: i32 },
    #[error("`{command}` on {host} exited with {code}")]
    CommandFailed { host: HostAddr, command: String, code: i32 },
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Adapter for running commands on a build host.
#[async_trait]
pub trait RemoteAdapter: Clone + Send + Sync + 'static {
    /// Run `command` in the foreground on `host` and return its exit code.
    ///
    /// A non-zero exit is returned as a value; only transport problems are errors.
    async fn run(
        &self,
        host: &HostAddr,
        command: &str,
        env: &CommandEnv,
        timeout: Duration,
    ) -> Result<i32, RemoteError>;

    /// Create `dirs` (and parents) on `host`.
    async fn mkdir_p(&self, host: &HostAddr, dirs: &[PathBuf]) -> Result<(), RemoteError> {
        if dirs.is_empty() {
            return Ok(());
        }
        let quoted: Vec<String> = dirs.iter().map(|d| shell_quote(&d.display().to_string())).collect();
        let command = format!("mkdir -p {}", quoted.join(" "));
        let code = self
            .run(host, &command, &CommandEnv::new(), crate::subprocess::REMOTE_COMMAND_TIMEOUT)
            .await?;
        if code != 0 {
            return Err(RemoteError::CommandFailed { host: host.clone(), command, code });
        }
        Ok(())
    }
}

/// SSH connection settings shared by remote commands and rsync transfers.
#[derive(Clone, Debug, Default)]
pub struct SshOptions {
    pub user: Option<String>,
    pub identity: Option<PathBuf>,
    pub host_key_policy: HostKeyPolicy,
}

impl SshOptions {
    pub fn new(host_key_policy: HostKeyPolicy) -> Self {
        Self { host_key_policy, ..Self::default() }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn identity(mut self, path: impl AsRef<Path>) -> Self {
        self.identity = Some(path.as_ref().to_path_buf());
        self
    }

    /// `[user@]host`
    pub fn destination(&self, host: &HostAddr) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        }
    }

    /// Options placed before the destination on an ssh command line.
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            format!("StrictHostKeyChecking={}", self.host_key_policy.ssh_option()),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if self.host_key_policy.is_relaxed() {
            // Unverified keys must not pollute known_hosts either
            args.push("-o".to_string());
            args.push("UserKnownHostsFile=/dev/null".to_string());
        }
        if let Some(identity) = &self.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args
    }
}

/// Runs remote commands through the system `ssh` client.
#[derive(Clone, Debug)]
pub struct SshRemote {
    options: SshOptions,
}

impl SshRemote {
    pub fn new(options: SshOptions) -> Self {
        if options.host_key_policy.is_relaxed() {
            tracing::warn!(
                "host key verification is relaxed for build hosts (StrictHostKeyChecking=no)"
            );
        }
        Self { options }
    }

    pub fn options(&self) -> &SshOptions {
        &self.options
    }

    /// Full ssh argument vector for running `script` on `host`.
    pub fn command_args(&self, host: &HostAddr, script: &str) -> Vec<String> {
        let mut args = self.options.ssh_args();
        args.push(self.options.destination(host));
        args.push("--".to_string());
        args.push(format!("bash -lc {}", shell_quote(script)));
        args
    }
}

#[async_trait]
impl RemoteAdapter for SshRemote {
    async fn run(
        &self,
        host: &HostAddr,
        command: &str,
        env: &CommandEnv,
        timeout: Duration,
    ) -> Result<i32, RemoteError> {
        let script = env.script(command);
        tracing::debug!(%host, command = %script, "[remote] run");
        let mut cmd = tokio::process::Command::new("ssh");
        cmd.args(self.command_args(host, &script));
        let desc = format!("[{}] {}", host, command);
        let code = run_streamed(cmd, timeout, &desc, Echo::Info).await?;
        if code == SSH_TRANSPORT_FAILURE {
            return Err(RemoteError::Transport { host: host.clone(), code });
        }
        Ok(code)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{RemoteAdapter, RemoteError};
    use crate::env::CommandEnv;
    use async_trait::async_trait;
    use fab_core::HostAddr;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Recorded remote command
    #[derive(Debug, Clone)]
    pub struct RemoteCall {
        pub host: HostAddr,
        pub command: String,
        pub env: CommandEnv,
    }

    #[derive(Default)]
    struct FakeRemoteState {
        calls: Vec<RemoteCall>,
        /// (host, substring, exit code); `None` host matches any
        exits: Vec<(Option<HostAddr>, String, i32)>,
        unreachable: Vec<HostAddr>,
    }

    /// Fake remote: records commands, returns scripted exit codes (default 0).
    #[derive(Clone, Default)]
    pub struct FakeRemote {
        inner: Arc<Mutex<FakeRemoteState>>,
    }

    impl FakeRemote {
        pub fn new() -> Self {
            Self::default()
        }

        /// Commands containing `pattern` exit with `code` on every host.
        pub fn exit_with(&self, pattern: &str, code: i32) {
            self.inner.lock().exits.push((None, pattern.to_string(), code));
        }

        /// Commands containing `pattern` exit with `code` on `host` only.
        pub fn exit_with_on(&self, host: &str, pattern: &str, code: i32) {
            self.inner.lock().exits.push((Some(HostAddr::new(host)), pattern.to_string(), code));
        }

        /// Every command to `host` fails with a transport error.
        pub fn unreachable(&self, host: &str) {
            self.inner.lock().unreachable.push(HostAddr::new(host));
        }

        pub fn calls(&self) -> Vec<RemoteCall> {
            self.inner.lock().calls.clone()
        }

        pub fn commands_on(&self, host: &str) -> Vec<String> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter(|c| c.host.as_str() == host)
                .map(|c| c.command.clone())
                .collect()
        }
    }

    #[async_trait]
    impl RemoteAdapter for FakeRemote {
        async fn run(
            &self,
            host: &HostAddr,
            command: &str,
            env: &CommandEnv,
            _timeout: Duration,
        ) -> Result<i32, RemoteError> {
            let mut state = self.inner.lock();
            state.calls.push(RemoteCall {
                host: host.clone(),
                command: command.to_string(),
                env: env.clone(),
            });
            if state.unreachable.contains(host) {
                return Err(RemoteError::Transport { host: host.clone(), code: 255 });
            }
            let code = state
                .exits
                .iter()
                .find(|(h, pattern, _)| {
                    h.as_ref().map_or(true, |h| h == host) && command.contains(pattern.as_str())
                })
                .map(|(_, _, code)| *code)
                .unwrap_or(0);
            Ok(code)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemote, RemoteCall};

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
