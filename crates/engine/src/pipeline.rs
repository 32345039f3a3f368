// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job build pipeline.
//!
//! ```text
//! GenerateRtl -> SyncSource -> RemoteBuild -> SyncResults -> RegisterImage
//!     -> PollCompletion -> Success | Failure -> Teardown
//! ```
//!
//! Every exit path, including bypass and cancellation, ends in teardown.

use fab_adapters::{CloudAdapter, NotifyAdapter, RemoteAdapter, ShellAdapter, SyncAdapter};
use fab_core::artifact::CHECKPOINTS_EXCLUDE;
use fab_core::{
    ArtifactSet, BuildJob, BuildOutcome, FleetConfig, HwdbEntry, Notification, Stage,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::deps::PipelineDeps;
use crate::error::PipelineError;
use crate::finalize::finalize;
use crate::job_logger::JobLogger;
use crate::poller::CompletionPoller;
use crate::registrar::ImageRegistrar;
use crate::remote_build::RemoteBuildExecutor;
use crate::sync::RemoteSyncEngine;
use crate::teardown::Teardown;
use crate::toolchain::{copy_generated_verilog, LocalToolchainRunner};

/// Other jobs' vendor trees never ride along with the platform push.
pub const PLATFORM_EXCLUDE: &str = "hdk/cl/developer_designs/cl_*";

pub struct Pipeline<L, R, Y, C, N> {
    deps: PipelineDeps<L, R, Y, C, N>,
    fleet: Arc<FleetConfig>,
    job: BuildJob,
    cancel: CancellationToken,
}

impl<L, R, Y, C, N> Pipeline<L, R, Y, C, N>
where
    L: ShellAdapter,
    R: RemoteAdapter,
    Y: SyncAdapter,
    C: CloudAdapter,
    N: NotifyAdapter,
{
    pub fn new(
        deps: PipelineDeps<L, R, Y, C, N>,
        fleet: Arc<FleetConfig>,
        job: BuildJob,
        cancel: CancellationToken,
    ) -> Self {
        Self { deps, fleet, job, cancel }
    }

    /// Drive the job to a terminal outcome. Never fails: errors become
    /// [`BuildOutcome::Failed`] after the failure path has run.
    pub async fn run(self, bypass: bool) -> BuildOutcome {
        let teardown =
            Teardown::new(self.deps.cloud.clone(), self.deps.notifier.clone(), self.job.clone());
        if bypass {
            tracing::info!("bypass: releasing host without building");
            teardown.terminate().await;
            return BuildOutcome::Bypassed;
        }

        let logger = JobLogger::new(self.fleet.layout().activity_log_path(&self.job));
        logger.append(Stage::GenerateRtl, &format!("build {} on {}", self.job.triplet(), self.job.host()));

        let mut stage = Stage::GenerateRtl;
        let outcome = match self.execute(&mut stage, &logger).await {
            Ok(entry) => {
                logger.append(Stage::Success, &format!("image {} available", entry.global_image_id));
                teardown.notify_once(Notification::build_completed(&entry)).await;
                BuildOutcome::Succeeded { global_image_id: entry.global_image_id }
            }
            Err(e) => {
                let reason = e.to_string();
                logger.append(Stage::Failure, &format!("{}: {}", stage, reason));
                teardown.fail(stage, &reason).await;
                BuildOutcome::Failed { stage, reason }
            }
        };

        teardown.terminate().await;
        logger.append(Stage::Teardown, &format!("host released; {}", outcome));
        write_outcome(&self.fleet.layout().outcome_path(&self.job), &outcome).await;
        outcome
    }

    async fn execute(&self, stage: &mut Stage, logger: &JobLogger) -> Result<HwdbEntry, PipelineError> {
        let layout = self.fleet.layout();
        let distributed = self.fleet.distributed_elaboration();
        let job = &self.job;
        let host = job.host();
        let toolchain = LocalToolchainRunner::new(self.deps.shell.clone(), layout.clone())
            .with_sim_lock(Arc::clone(&self.deps.sim_lock));
        let sync = RemoteSyncEngine::new(self.deps.sync.clone(), self.deps.remote.clone());
        let builder = RemoteBuildExecutor::new(self.deps.remote.clone());

        *stage = Stage::GenerateRtl;
        let artifacts = self.guarded(toolchain.resolve_artifacts(job)).await?;
        if distributed {
            self.guarded(toolchain.gen_replace_rtl_script(job)).await?;
        } else {
            self.guarded(toolchain.replace_rtl(job, &artifacts)).await?;
        }

        *stage = Stage::SyncSource;
        logger.append(*stage, "preparing host and pushing sources");
        self.guarded(sync.prepare_host(host, &host_dirs(&self.fleet, &artifacts))).await?;
        let platform = layout.platform_root();
        self.guarded(sync.push(host, platform, platform, &[PLATFORM_EXCLUDE])).await?;
        if distributed {
            let template = layout.template_dir();
            self.guarded(sync.push(host, &template, &template, &[CHECKPOINTS_EXCLUDE])).await?;
            let generated = &artifacts.generated_dir;
            self.guarded(sync.push(host, generated, generated, &[])).await?;
            let bundle = &artifacts.elaboration_bundle;
            self.guarded(sync.push_file(host, bundle, bundle)).await?;
        } else {
            let tree = &artifacts.fpga_build_dir;
            self.guarded(sync.push(host, tree, tree, &[CHECKPOINTS_EXCLUDE])).await?;
        }

        *stage = Stage::RemoteBuild;
        if distributed {
            logger.append(*stage, "elaborating on host");
            self.guarded(builder.elaborate(host, &artifacts.elaboration_script())).await?;
            self.guarded(sync.pull(host, &artifacts.generated_dir, &artifacts.pulled_generated_dir(), &[]))
                .await?;
            let design = artifacts.pulled_design_tree();
            self.guarded(sync.pull(host, &artifacts.fpga_build_dir, &design, &[])).await?;
            self.guarded(copy_generated_verilog(&design, &artifacts)).await?;
        }
        logger.append(*stage, "running synthesis");
        let code = self.guarded(builder.synthesize(host, platform, &artifacts.fpga_build_dir)).await?;
        logger.append(*stage, &format!("synthesis exited with code {}", code));

        // Results come back even after a failed synthesis so its logs are local
        *stage = Stage::SyncResults;
        let pulled = self
            .guarded(sync.pull(host, &artifacts.fpga_build_dir, &artifacts.results_build_tree(), &[]))
            .await;
        if code != 0 {
            if let Err(e) = pulled {
                tracing::warn!(error = %e, "could not retrieve logs of failed synthesis");
            }
            *stage = Stage::RemoteBuild;
            return Err(PipelineError::Toolchain { stage: "synthesis", code });
        }
        pulled?;

        *stage = Stage::RegisterImage;
        let commit = self.guarded(toolchain.commit_tag()).await?;
        let registrar = ImageRegistrar::new(self.deps.cloud.clone(), self.fleet.bucket());
        let mut image = self.guarded(registrar.register(job, &artifacts, &commit)).await?;
        logger.append(*stage, &format!("requested image {} ({})", image.ids.image_id, image.key));
        if distributed {
            let pulled_generated = artifacts.pulled_generated_dir();
            self.guarded(toolchain.build_driver(job, Some(&pulled_generated))).await?;
        }

        *stage = Stage::PollCompletion;
        let poller = CompletionPoller::new(self.deps.cloud.clone(), self.fleet.poll());
        let polled = poller.wait(&mut image, &artifacts.image_info_path(), &self.cancel).await;
        if let Ok(raw) = tokio::fs::read_to_string(artifacts.image_info_path()).await {
            logger.append_fenced(*stage, "json", &raw);
        }
        polled?;

        *stage = Stage::Success;
        self.guarded(finalize(
            &self.deps.cloud,
            &toolchain,
            layout,
            self.fleet.post_build_hook(),
            job,
            &image,
            &artifacts,
        ))
        .await
    }

    /// Race `fut` against cancellation. Dropping an in-flight step kills its
    /// child process.
    async fn guarded<T>(&self, fut: impl Future<Output = Result<T, PipelineError>>) -> Result<T, PipelineError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            result = fut => result,
        }
    }
}

/// Directories that must exist on the host before the first push.
fn host_dirs(fleet: &FleetConfig, artifacts: &ArtifactSet) -> Vec<PathBuf> {
    let layout = fleet.layout();
    let mut dirs = vec![layout.deploy_dir().to_path_buf(), artifacts.generated_dir.clone()];
    if let Some(parent) = artifacts.elaboration_bundle.parent() {
        dirs.push(parent.to_path_buf());
    }
    dirs.push(layout.platform_root().to_path_buf());
    dirs.push(layout.template_dir());
    dirs.push(artifacts.fpga_build_dir.clone());
    dirs
}

/// Record the outcome as JSON at `path` for later inspection.
async fn write_outcome(path: &Path, outcome: &BuildOutcome) {
    if let Err(e) = try_write_outcome(path, outcome).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to write outcome");
    }
}

async fn try_write_outcome(path: &Path, outcome: &BuildOutcome) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(outcome).map_err(std::io::Error::other)?;
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, json).await
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
