// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fab-engine: per-job build pipeline and fleet dispatch

mod deps;
mod error;
mod finalize;
mod fleet;
mod job_logger;
mod pipeline;
mod poller;
mod registrar;
mod remote_build;
mod sync;
mod teardown;
mod toolchain;

#[cfg(test)]
mod test_harness;

pub use deps::PipelineDeps;
pub use error::PipelineError;
pub use finalize::{finalize, write_hwdb_entry};
pub use fleet::{FleetReport, FleetRunError, FleetRunner, JobReport, RunId};
pub use job_logger::JobLogger;
pub use pipeline::{Pipeline, PLATFORM_EXCLUDE};
pub use poller::CompletionPoller;
pub use registrar::{locate_archive, ImageRegistrar, LOGS_PREFIX};
pub use remote_build::{RemoteBuildExecutor, ELABORATION_PACKAGES, SYNTHESIS_SCRIPT};
pub use sync::RemoteSyncEngine;
pub use teardown::Teardown;
pub use toolchain::LocalToolchainRunner;
