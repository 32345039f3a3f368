// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for CLI specs.

use assert_cmd::Command;
use std::path::{Path, PathBuf};

/// A `fab` invocation isolated from the caller's environment.
pub fn cli() -> Command {
    let mut cmd = Command::cargo_bin("fab").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("FAB_DEPLOY_DIR")
        .env_remove("FAB_POLL_INTERVAL_MS")
        .env_remove("FAB_MAX_POLLS")
        .env("FAB_LOG", "warn");
    cmd
}

/// Captured result of a finished command.
pub struct Run {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Run {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout lacks {:?}:\n{}", needle, self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr lacks {:?}:\n{}", needle, self.stderr);
        self
    }
}

pub trait CommandExt {
    fn run(&mut self) -> Run;
    fn passes(&mut self) -> Run;
    fn exits_with(&mut self, code: i32) -> Run;
}

impl CommandExt for Command {
    fn run(&mut self) -> Run {
        let output = self.output().unwrap();
        Run {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    fn passes(&mut self) -> Run {
        self.exits_with(0)
    }

    fn exits_with(&mut self, code: i32) -> Run {
        let run = self.run();
        assert_eq!(run.code, Some(code), "stdout:\n{}\nstderr:\n{}", run.stdout, run.stderr);
        run
    }
}

/// A scratch deploy tree holding recipes.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `rel`, creating parents; returns the full path.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write an executable script to `rel`.
    #[cfg(unix)]
    pub fn script(&self, rel: &str, content: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.file(rel, content);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

pub const ONE_BUILD: &str = r#"# Single rocket build
bucket = "firesim-images"

[notify]
kind = "silent"

[[build]]
name = "rocket"
design = "FireSim"
target_config = "FireSimRocketConfig"
platform_config = "BaseF1Config"
host = "10.0.0.1"
instance_id = "i-0abc"
"#;
