// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fab_adapters::{CloudAdapter, NotifyAdapter, RemoteAdapter, ShellAdapter, SyncAdapter};
use std::sync::Arc;
use tokio::sync::Mutex;

/// External-world adapters a pipeline needs. Cloned into every job task.
#[derive(Clone)]
pub struct PipelineDeps<L, R, Y, C, N> {
    pub shell: L,
    pub remote: R,
    pub sync: Y,
    pub cloud: C,
    pub notifier: N,
    /// Held by local make runs; one per fleet run, shared by every job.
    pub sim_lock: Arc<Mutex<()>>,
}

impl<L, R, Y, C, N> PipelineDeps<L, R, Y, C, N>
where
    L: ShellAdapter,
    R: RemoteAdapter,
    Y: SyncAdapter,
    C: CloudAdapter,
    N: NotifyAdapter,
{
    pub fn new(shell: L, remote: R, sync: Y, cloud: C, notifier: N) -> Self {
        Self { shell, remote, sync, cloud, notifier, sim_lock: Arc::new(Mutex::new(())) }
    }
}
