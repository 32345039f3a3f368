// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Explicit execution environment for toolchain commands.
//!
//! Commands never rely on the manager process's working directory or on
//! mutated process environment; everything a command needs is carried here
//! and rendered into the command line (remote) or the `Command` (local).

use std::path::{Path, PathBuf};

use crate::subprocess::shell_quote;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnv {
    cwd: Option<PathBuf>,
    vars: Vec<(String, String)>,
    setup: Vec<String>,
}

impl CommandEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Export `key=value` for the command.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    /// Export `key` with the manager's value, when set.
    pub fn inherit(self, key: &str) -> Self {
        match std::env::var(key) {
            Ok(value) => self.var(key, value),
            Err(_) => self,
        }
    }

    /// A shell step run before the command, in order (e.g. `source hdk_setup.sh`).
    pub fn setup(mut self, step: impl Into<String>) -> Self {
        self.setup.push(step.into());
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub fn setup_steps(&self) -> &[String] {
        &self.setup
    }

    /// Render a self-contained script: `cd`, exports, setup steps, then `command`,
    /// chained with `&&` so any failing prefix stops the command.
    pub fn script(&self, command: &str) -> String {
        let mut parts = Vec::with_capacity(self.vars.len() + self.setup.len() + 2);
        if let Some(cwd) = &self.cwd {
            parts.push(format!("cd {}", shell_quote(&cwd.display().to_string())));
        }
        for (key, value) in &self.vars {
            parts.push(format!("export {}={}", key, shell_quote(value)));
        }
        parts.extend(self.setup.iter().cloned());
        parts.push(command.to_string());
        parts.join(" && ")
    }

    /// Like [`script`](Self::script) without the `cd` and exports, for local
    /// commands where those are applied to the `Command` directly.
    pub fn local_script(&self, command: &str) -> String {
        let mut parts: Vec<String> = self.setup.clone();
        parts.push(command.to_string());
        parts.join(" && ")
    }
}
