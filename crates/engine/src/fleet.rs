// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet dispatch: one pipeline task per build host.

use fab_adapters::{CloudAdapter, NotifyAdapter, RemoteAdapter, ShellAdapter, SyncAdapter};
use fab_core::{BuildJob, BuildOutcome, FleetConfig, HostAddr, Stage};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::deps::PipelineDeps;
use crate::pipeline::Pipeline;
use crate::teardown::Teardown;

/// Identifies one invocation across every job's logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(uuid::Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FleetRunError {
    #[error("build task for {host} panicked: {message}")]
    TaskPanicked { host: HostAddr, message: String },
    #[error("build task for {host} was cancelled")]
    TaskCancelled { host: HostAddr },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub name: String,
    pub host: HostAddr,
    pub build_dir: String,
    pub outcome: BuildOutcome,
}

impl JobReport {
    fn new(job: &BuildJob, outcome: BuildOutcome) -> Self {
        Self {
            name: job.name().to_string(),
            host: job.host().clone(),
            build_dir: job.build_dir_name().to_string(),
            outcome,
        }
    }
}

/// Per-job outcomes in recipe order.
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub run_id: RunId,
    pub jobs: Vec<JobReport>,
    /// First task that died outside its pipeline. Its job is still listed
    /// in `jobs` as failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<FleetRunError>,
}

impl FleetReport {
    pub fn all_succeeded(&self) -> bool {
        self.jobs.iter().all(|j| matches!(j.outcome, BuildOutcome::Succeeded { .. } | BuildOutcome::Bypassed))
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|j| matches!(j.outcome, BuildOutcome::Failed { .. }))
    }
}

pub struct FleetRunner<L, R, Y, C, N> {
    deps: PipelineDeps<L, R, Y, C, N>,
    fleet: Arc<FleetConfig>,
    cancel: CancellationToken,
    run_id: RunId,
}

impl<L, R, Y, C, N> FleetRunner<L, R, Y, C, N>
where
    L: ShellAdapter,
    R: RemoteAdapter,
    Y: SyncAdapter,
    C: CloudAdapter,
    N: NotifyAdapter,
{
    pub fn new(deps: PipelineDeps<L, R, Y, C, N>, fleet: FleetConfig, cancel: CancellationToken) -> Self {
        Self { deps, fleet: Arc::new(fleet), cancel, run_id: RunId::new() }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Run every job concurrently and wait for all of them.
    ///
    /// A job's failure never affects another job. A task that panics gets
    /// the failure path here instead: one notification, then host release.
    pub async fn run(&self, bypass: bool) -> FleetReport {
        let jobs = self.fleet.jobs();
        tracing::info!(run_id = %self.run_id, jobs = jobs.len(), bypass, "dispatching builds");

        let mut tasks = JoinSet::new();
        let mut by_task = HashMap::new();
        for (index, job) in jobs.iter().enumerate() {
            let pipeline = Pipeline::new(
                self.deps.clone(),
                Arc::clone(&self.fleet),
                job.clone(),
                self.cancel.child_token(),
            );
            let span = tracing::info_span!("job", name = %job.name(), host = %job.host());
            let handle = tasks.spawn(pipeline.run(bypass).instrument(span));
            by_task.insert(handle.id(), index);
        }

        let mut outcomes: Vec<Option<BuildOutcome>> = vec![None; jobs.len()];
        let mut aborted = None;
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Some(&index) = by_task.get(&id) {
                        tracing::info!(host = %jobs[index].host(), %outcome, "job finished");
                        outcomes[index] = Some(outcome);
                    }
                }
                Err(e) => {
                    let Some(&index) = by_task.get(&e.id()) else { continue };
                    let job = &jobs[index];
                    let error = if e.is_panic() {
                        FleetRunError::TaskPanicked { host: job.host().clone(), message: panic_message(e.into_panic()) }
                    } else {
                        FleetRunError::TaskCancelled { host: job.host().clone() }
                    };
                    outcomes[index] = Some(self.abort_job(job, &error).await);
                    aborted.get_or_insert(error);
                }
            }
        }

        let reports = jobs
            .iter()
            .zip(outcomes)
            .filter_map(|(job, outcome)| outcome.map(|o| JobReport::new(job, o)))
            .collect();
        let report = FleetReport { run_id: self.run_id, jobs: reports, aborted };
        tracing::info!(run_id = %self.run_id, all_succeeded = report.all_succeeded(), "all builds finished");
        report
    }

    async fn abort_job(&self, job: &BuildJob, error: &FleetRunError) -> BuildOutcome {
        let reason = error.to_string();
        let teardown = Teardown::new(self.deps.cloud.clone(), self.deps.notifier.clone(), job.clone());
        teardown.fail(Stage::Failure, &reason).await;
        BuildOutcome::Failed { stage: Stage::Failure, reason }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
