// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local command execution on the manager.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::env::CommandEnv;
use crate::subprocess::{run_streamed, run_with_timeout, Echo, SubprocessError};

/// Errors from running local commands.
///
/// A non-zero exit is not an error at this layer; callers decide.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Captured result of a local command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Adapter for running commands in the manager's toolchain environment.
#[async_trait]
pub trait ShellAdapter: Clone + Send + Sync + 'static {
    /// Run `command`, streaming its output to the log. Returns the exit code.
    async fn run(&self, command: &str, env: &CommandEnv) -> Result<i32, ShellError>;

    /// Run `command` and capture its output.
    async fn capture(&self, command: &str, env: &CommandEnv) -> Result<CommandOutput, ShellError>;
}

/// Runs commands through `bash -c` with the env's cwd and exports applied.
#[derive(Clone, Debug)]
pub struct LocalShell {
    timeout: Duration,
}

impl LocalShell {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, command: &str, env: &CommandEnv) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c").arg(env.local_script(command));
        if let Some(cwd) = env.working_dir() {
            cmd.current_dir(cwd);
        }
        for (key, value) in env.vars() {
            cmd.env(key, value);
        }
        cmd
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new(crate::subprocess::TOOLCHAIN_TIMEOUT)
    }
}

#[async_trait]
impl ShellAdapter for LocalShell {
    async fn run(&self, command: &str, env: &CommandEnv) -> Result<i32, ShellError> {
        tracing::debug!(command, "[localhost] run");
        let code = run_streamed(self.command(command, env), self.timeout, command, Echo::Info).await?;
        Ok(code)
    }

    async fn capture(&self, command: &str, env: &CommandEnv) -> Result<CommandOutput, ShellError> {
        tracing::debug!(command, "[localhost] capture");
        let output = run_with_timeout(self.command(command, env), self.timeout, command).await?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{CommandOutput, ShellAdapter, ShellError};
    use crate::env::CommandEnv;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded local command
    #[derive(Debug, Clone)]
    pub struct ShellCall {
        pub command: String,
        pub env: CommandEnv,
    }

    #[derive(Default)]
    struct FakeShellState {
        calls: Vec<ShellCall>,
        /// (substring, canned output); first match wins
        responses: Vec<(String, CommandOutput)>,
    }

    /// Fake shell: records commands and answers from canned responses.
    ///
    /// Commands without a matching response succeed with empty output.
    #[derive(Clone, Default)]
    pub struct FakeShell {
        inner: Arc<Mutex<FakeShellState>>,
    }

    impl FakeShell {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer any command containing `pattern` with `output`.
        pub fn respond(&self, pattern: &str, output: CommandOutput) {
            self.inner.lock().responses.push((pattern.to_string(), output));
        }

        /// Answer any command containing `pattern` with exit 0 and `stdout`.
        pub fn respond_stdout(&self, pattern: &str, stdout: &str) {
            self.respond(pattern, CommandOutput { code: 0, stdout: stdout.to_string(), stderr: String::new() });
        }

        /// Fail any command containing `pattern` with `code`.
        pub fn fail(&self, pattern: &str, code: i32) {
            self.respond(pattern, CommandOutput { code, stdout: String::new(), stderr: "failed".to_string() });
        }

        pub fn calls(&self) -> Vec<ShellCall> {
            self.inner.lock().calls.clone()
        }

        pub fn commands(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|c| c.command.clone()).collect()
        }

        fn answer(&self, command: &str, env: &CommandEnv) -> CommandOutput {
            let mut state = self.inner.lock();
            state.calls.push(ShellCall { command: command.to_string(), env: env.clone() });
            state
                .responses
                .iter()
                .find(|(pattern, _)| command.contains(pattern.as_str()))
                .map(|(_, output)| output.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl ShellAdapter for FakeShell {
        async fn run(&self, command: &str, env: &CommandEnv) -> Result<i32, ShellError> {
            Ok(self.answer(command, env).code)
        }

        async fn capture(&self, command: &str, env: &CommandEnv) -> Result<CommandOutput, ShellError> {
            Ok(self.answer(command, env))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeShell, ShellCall};

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
