// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File transfer between the manager and build hosts via rsync.

use async_trait::async_trait;
use fab_core::HostAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::remote::SshOptions;
use crate::subprocess::{run_with_timeout, stderr_summary, SubprocessError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{direction} {local} <-> {host}:{remote} failed (exit {code}): {stderr}")]
    Failed {
        direction: SyncDirection,
        host: HostAddr,
        local: String,
        remote: String,
        code: i32,
        stderr: String,
    },
    #[error("sync i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Manager -> host
    Push,
    /// Host -> manager
    Pull,
}

fab_core::simple_display! {
    SyncDirection {
        Push => "push",
        Pull => "pull",
    }
}

/// Whether a transfer copies a directory's contents or a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Tree,
    File,
}

/// One transfer. Tree transfers copy the *contents* of the source directory
/// into the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub host: HostAddr,
    pub direction: SyncDirection,
    pub kind: TransferKind,
    pub local: PathBuf,
    pub remote: PathBuf,
    pub excludes: Vec<String>,
}

/// Adapter for moving files to and from a build host.
#[async_trait]
pub trait SyncAdapter: Clone + Send + Sync + 'static {
    async fn transfer(&self, request: &SyncRequest) -> Result<(), SyncError>;
}

/// rsync over ssh: symlinks preserved, partial files kept for resumption.
#[derive(Clone, Debug)]
pub struct RsyncAdapter {
    ssh: SshOptions,
    timeout: Duration,
}

impl RsyncAdapter {
    pub fn new(ssh: SshOptions) -> Self {
        Self { ssh, timeout: crate::subprocess::SYNC_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full rsync argument vector for `request`.
    pub fn rsync_args(&self, request: &SyncRequest) -> Vec<String> {
        let mut args = vec![
            "-pthrvz".to_string(),
            // keep symlinks as symlinks
            "-l".to_string(),
            "--partial".to_string(),
            "--protect-args".to_string(),
            "-e".to_string(),
            format!("ssh {}", self.ssh.ssh_args().join(" ")),
        ];
        for pattern in &request.excludes {
            args.push(format!("--exclude={}", pattern));
        }

        let local = request.local.display().to_string();
        let remote = format!("{}:{}", self.ssh.destination(&request.host), request.remote.display());
        let (src, dst) = match request.direction {
            SyncDirection::Push => (local, remote),
            SyncDirection::Pull => (remote, local),
        };
        match request.kind {
            TransferKind::Tree => args.push(format!("{}/", src.trim_end_matches('/'))),
            TransferKind::File => args.push(src),
        }
        args.push(dst);
        args
    }
}

#[async_trait]
impl SyncAdapter for RsyncAdapter {
    async fn transfer(&self, request: &SyncRequest) -> Result<(), SyncError> {
        let args = self.rsync_args(request);
        tracing::debug!(host = %request.host, ?args, "rsync");
        let mut cmd = tokio::process::Command::new("rsync");
        cmd.args(&args);
        let desc = format!("rsync {} {}", request.direction, request.host);
        let output = run_with_timeout(cmd, self.timeout, &desc).await?;
        tracing::debug!(stdout = %String::from_utf8_lossy(&output.stdout), "rsync output");
        if !output.status.success() {
            return Err(SyncError::Failed {
                direction: request.direction,
                host: request.host.clone(),
                local: request.local.display().to_string(),
                remote: request.remote.display().to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr_summary(&output),
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{SyncAdapter, SyncDirection, SyncError, SyncRequest, TransferKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeSyncState {
        calls: Vec<SyncRequest>,
        fail_patterns: Vec<(SyncDirection, String)>,
    }

    /// Fake sync adapter.
    ///
    /// Records every request. With a mirror root, transfers really copy files
    /// between the local paths and `<root>/<host>/<remote path>`, honouring
    /// excludes and keeping symlinks, so tests can inspect the "remote" tree.
    #[derive(Clone, Default)]
    pub struct FakeSyncAdapter {
        inner: Arc<Mutex<FakeSyncState>>,
        mirror: Option<PathBuf>,
    }

    impl FakeSyncAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_mirror(root: impl Into<PathBuf>) -> Self {
            Self { inner: Arc::default(), mirror: Some(root.into()) }
        }

        /// Fail `direction` transfers whose remote path contains `pattern`.
        pub fn fail_on(&self, direction: SyncDirection, pattern: &str) {
            self.inner.lock().fail_patterns.push((direction, pattern.to_string()));
        }

        pub fn calls(&self) -> Vec<SyncRequest> {
            self.inner.lock().calls.clone()
        }

        /// Path of `remote` on `host` inside the mirror.
        pub fn mirror_path(&self, host: &str, remote: &Path) -> Option<PathBuf> {
            let rel = remote.strip_prefix("/").unwrap_or(remote);
            self.mirror.as_ref().map(|root| root.join(host).join(rel))
        }

        fn should_fail(&self, request: &SyncRequest) -> bool {
            let remote = request.remote.display().to_string();
            self.inner
                .lock()
                .fail_patterns
                .iter()
                .any(|(dir, pattern)| *dir == request.direction && remote.contains(pattern.as_str()))
        }
    }

    #[async_trait]
    impl SyncAdapter for FakeSyncAdapter {
        async fn transfer(&self, request: &SyncRequest) -> Result<(), SyncError> {
            self.inner.lock().calls.push(request.clone());
            if self.should_fail(request) {
                return Err(SyncError::Failed {
                    direction: request.direction,
                    host: request.host.clone(),
                    local: request.local.display().to_string(),
                    remote: request.remote.display().to_string(),
                    code: 23,
                    stderr: "injected failure".to_string(),
                });
            }
            let Some(mirrored) = self.mirror_path(request.host.as_str(), &request.remote) else {
                return Ok(());
            };
            let (src, dst) = match request.direction {
                SyncDirection::Push => (request.local.clone(), mirrored),
                SyncDirection::Pull => (mirrored, request.local.clone()),
            };
            match request.kind {
                TransferKind::File => copy_entry(&src, &dst),
                TransferKind::Tree => copy_tree(&src, &dst, Path::new(""), &request.excludes),
            }
        }
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SyncError + '_ {
        move |source| SyncError::Io { path: path.to_path_buf(), source }
    }

    fn excluded(rel: &Path, excludes: &[String]) -> bool {
        let rel = rel.to_string_lossy();
        excludes.iter().any(|pattern| {
            glob::Pattern::new(pattern).map(|p| p.matches(&rel)).unwrap_or(false)
                || rel == pattern.as_str()
        })
    }

    fn copy_tree(src: &Path, dst: &Path, rel: &Path, excludes: &[String]) -> Result<(), SyncError> {
        std::fs::create_dir_all(dst).map_err(io_err(dst))?;
        let entries = std::fs::read_dir(src).map_err(io_err(src))?;
        for entry in entries {
            let entry = entry.map_err(io_err(src))?;
            let child_rel = rel.join(entry.file_name());
            if excluded(&child_rel, excludes) {
                continue;
            }
            let from = entry.path();
            let to = dst.join(entry.file_name());
            let file_type = entry.file_type().map_err(io_err(&from))?;
            if file_type.is_dir() {
                copy_tree(&from, &to, &child_rel, excludes)?;
            } else {
                copy_entry(&from, &to)?;
            }
        }
        Ok(())
    }

    fn copy_entry(from: &Path, to: &Path) -> Result<(), SyncError> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let meta = std::fs::symlink_metadata(from).map_err(io_err(from))?;
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(from).map_err(io_err(from))?;
            if std::fs::symlink_metadata(to).is_ok() {
                std::fs::remove_file(to).map_err(io_err(to))?;
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(&target, to).map_err(io_err(to))?;
            #[cfg(not(unix))]
            std::fs::copy(from, to).map(|_| ()).map_err(io_err(to))?;
            return Ok(());
        }
        std::fs::copy(from, to).map_err(io_err(to))?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSyncAdapter;

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
