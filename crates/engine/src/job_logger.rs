// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-job activity log in the job's results directory.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fab_core::Stage;

/// Writes human-readable timestamped lines to `<results>/build.log`.
///
/// Each `append()` call opens, writes, and closes the file; stage
/// transitions are infrequent. Failures are logged via tracing and never
/// propagate.
#[derive(Debug, Clone)]
pub struct JobLogger {
    path: PathBuf,
}

impl JobLogger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format: `2026-01-30T08:14:09Z [stage] message`
    pub fn append(&self, stage: Stage, message: &str) {
        if let Err(e) = self.write_line(stage, message) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write job log");
        }
    }

    /// Append a fenced block, e.g. a provider response.
    pub fn append_fenced(&self, stage: Stage, label: &str, content: &str) {
        if let Err(e) = self.write_fenced(stage, label, content) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write job log");
        }
    }

    fn open(&self) -> std::io::Result<fs::File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }

    fn write_line(&self, stage: Stage, message: &str) -> std::io::Result<()> {
        let mut file = self.open()?;
        writeln!(file, "{} [{}] {}", utc_now(), stage, message)
    }

    fn write_fenced(&self, stage: Stage, label: &str, content: &str) -> std::io::Result<()> {
        let mut file = self.open()?;
        writeln!(file, "{} [{}] ```{}", utc_now(), stage, label)?;
        write!(file, "{}", content)?;
        if !content.ends_with('\n') {
            writeln!(file)?;
        }
        writeln!(file, "{} [{}] ```", utc_now(), stage)
    }
}

fn utc_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
#[path = "job_logger_tests.rs"]
mod tests;
