// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push/pull of build trees between the manager and a build host.

use fab_adapters::{RemoteAdapter, SyncAdapter, SyncDirection, SyncRequest, TransferKind};
use fab_core::HostAddr;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Wraps the transfer adapter with directory preparation on the receiving side.
///
/// Transfers are delta-based and resumable, so every operation is safe to rerun.
pub struct RemoteSyncEngine<Y, R> {
    sync: Y,
    remote: R,
}

impl<Y: SyncAdapter, R: RemoteAdapter> RemoteSyncEngine<Y, R> {
    pub fn new(sync: Y, remote: R) -> Self {
        Self { sync, remote }
    }

    /// Create `dirs` on `host` ahead of transfers.
    pub async fn prepare_host(&self, host: &HostAddr, dirs: &[PathBuf]) -> Result<(), PipelineError> {
        self.remote.mkdir_p(host, dirs).await?;
        Ok(())
    }

    /// Copy the contents of `local` into `remote` on `host`.
    pub async fn push(
        &self,
        host: &HostAddr,
        local: &Path,
        remote: &Path,
        excludes: &[&str],
    ) -> Result<(), PipelineError> {
        self.remote.mkdir_p(host, &[remote.to_path_buf()]).await?;
        self.transfer(host, SyncDirection::Push, TransferKind::Tree, local, remote, excludes).await
    }

    /// Copy a single file to the same-named path on `host`.
    pub async fn push_file(&self, host: &HostAddr, local: &Path, remote: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = remote.parent() {
            self.remote.mkdir_p(host, &[parent.to_path_buf()]).await?;
        }
        self.transfer(host, SyncDirection::Push, TransferKind::File, local, remote, &[]).await
    }

    /// Copy the contents of `remote` on `host` into `local`.
    pub async fn pull(
        &self,
        host: &HostAddr,
        remote: &Path,
        local: &Path,
        excludes: &[&str],
    ) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(local).await.map_err(PipelineError::io(local))?;
        self.transfer(host, SyncDirection::Pull, TransferKind::Tree, local, remote, excludes).await
    }

    async fn transfer(
        &self,
        host: &HostAddr,
        direction: SyncDirection,
        kind: TransferKind,
        local: &Path,
        remote: &Path,
        excludes: &[&str],
    ) -> Result<(), PipelineError> {
        tracing::debug!(%host, %direction, local = %local.display(), remote = %remote.display(), "sync");
        let request = SyncRequest {
            host: host.clone(),
            direction,
            kind,
            local: local.to_path_buf(),
            remote: remote.to_path_buf(),
            excludes: excludes.iter().map(|e| e.to_string()).collect(),
        };
        self.sync.transfer(&request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
