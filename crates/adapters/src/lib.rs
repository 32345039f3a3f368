// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fab-adapters: I/O boundaries of the build orchestrator
//!
//! Each external system (local toolchain shell, ssh, rsync, the cloud
//! provider, notification sinks) sits behind a trait with a real
//! implementation and, under `test-support`, a recording fake.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cloud;
pub mod env;
pub mod notify;
pub mod remote;
pub mod shell;
pub mod subprocess;
pub mod sync;

pub use cloud::{AwsCliAdapter, CloudAdapter, CloudError, CreateImageRequest, ImageStatus};
pub use env::CommandEnv;
pub use notify::{DesktopNotifyAdapter, NotifyAdapter, NotifyError, Notifier, SnsNotifyAdapter};
pub use remote::{RemoteAdapter, RemoteError, SshOptions, SshRemote};
pub use shell::{CommandOutput, LocalShell, ShellAdapter, ShellError};
pub use subprocess::SubprocessError;
pub use sync::{RsyncAdapter, SyncAdapter, SyncDirection, SyncError, SyncRequest, TransferKind};

#[cfg(any(test, feature = "test-support"))]
pub use cloud::{CloudCall, FakeCloud};
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use remote::{FakeRemote, RemoteCall};
#[cfg(any(test, feature = "test-support"))]
pub use shell::{FakeShell, ShellCall};
#[cfg(any(test, feature = "test-support"))]
pub use sync::FakeSyncAdapter;
