// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet-wide, read-only build configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::artifact::DeployLayout;
use crate::job::{BuildJob, HostAddr};

/// Errors detected while assembling a fleet configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FleetError {
    #[error("invalid build job '{name}': {reason}")]
    InvalidJob { name: String, reason: String },
    #[error("host {0} is bound to more than one build")]
    DuplicateHost(HostAddr),
    #[error("build dir '{0}' is used by more than one build")]
    DuplicateBuildDir(String),
    #[error("object storage bucket name is empty")]
    MissingBucket,
    #[error("poll interval must be non-zero and max polls at least 1")]
    InvalidPoll,
}

/// How strictly build hosts' SSH identities are checked.
///
/// Build hosts are ephemeral and usually absent from `known_hosts`, so the
/// default accepts any key. `AcceptNew` pins a host on first contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    #[default]
    Relaxed,
    AcceptNew,
    Strict,
}

impl HostKeyPolicy {
    /// Value for ssh's `StrictHostKeyChecking` option.
    pub fn ssh_option(self) -> &'static str {
        match self {
            HostKeyPolicy::Relaxed => "no",
            HostKeyPolicy::AcceptNew => "accept-new",
            HostKeyPolicy::Strict => "yes",
        }
    }

    pub fn is_relaxed(self) -> bool {
        matches!(self, HostKeyPolicy::Relaxed)
    }
}

crate::simple_display! {
    HostKeyPolicy {
        Relaxed => "relaxed",
        AcceptNew => "accept-new",
        Strict => "strict",
    }
}

/// Bounds for the image completion poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_polls: u32,
}

impl PollConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
    /// Two hours at the default interval.
    pub const DEFAULT_MAX_POLLS: u32 = 720;

    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self { interval, max_polls }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: Self::DEFAULT_INTERVAL, max_polls: Self::DEFAULT_MAX_POLLS }
    }
}

/// Configuration shared by every job in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    bucket: String,
    distributed_elaboration: bool,
    post_build_hook: Option<String>,
    poll: PollConfig,
    host_key_policy: HostKeyPolicy,
    layout: DeployLayout,
    jobs: Vec<BuildJob>,
}

impl FleetConfig {
    pub fn builder(bucket: impl Into<String>, layout: DeployLayout) -> FleetConfigBuilder {
        FleetConfigBuilder {
            bucket: bucket.into(),
            layout,
            distributed_elaboration: false,
            post_build_hook: None,
            poll: PollConfig::default(),
            host_key_policy: HostKeyPolicy::default(),
            jobs: Vec::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn distributed_elaboration(&self) -> bool {
        self.distributed_elaboration
    }

    pub fn post_build_hook(&self) -> Option<&str> {
        self.post_build_hook.as_deref()
    }

    pub fn poll(&self) -> PollConfig {
        self.poll
    }

    pub fn host_key_policy(&self) -> HostKeyPolicy {
        self.host_key_policy
    }

    pub fn layout(&self) -> &DeployLayout {
        &self.layout
    }

    pub fn jobs(&self) -> &[BuildJob] {
        &self.jobs
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostAddr> {
        self.jobs.iter().map(BuildJob::host)
    }

    /// The job bound to `host`, if any.
    pub fn build_by_host(&self, host: &HostAddr) -> Option<&BuildJob> {
        self.jobs.iter().find(|job| job.host() == host)
    }
}

/// Builder for [`FleetConfig`]; [`build`](FleetConfigBuilder::build) enforces
/// the one-host-one-job binding.
#[derive(Debug, Clone)]
pub struct FleetConfigBuilder {
    bucket: String,
    layout: DeployLayout,
    distributed_elaboration: bool,
    post_build_hook: Option<String>,
    poll: PollConfig,
    host_key_policy: HostKeyPolicy,
    jobs: Vec<BuildJob>,
}

impl FleetConfigBuilder {
    crate::setters! {
        set { distributed_elaboration: bool, poll: PollConfig, host_key_policy: HostKeyPolicy }
        option { post_build_hook: String }
    }

    pub fn job(mut self, job: BuildJob) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn jobs(mut self, jobs: impl IntoIterator<Item = BuildJob>) -> Self {
        self.jobs.extend(jobs);
        self
    }

    pub fn build(self) -> Result<FleetConfig, FleetError> {
        if self.bucket.trim().is_empty() {
            return Err(FleetError::MissingBucket);
        }
        if self.poll.interval.is_zero() || self.poll.max_polls == 0 {
            return Err(FleetError::InvalidPoll);
        }

        let mut hosts = HashSet::new();
        let mut build_dirs = HashSet::new();
        for job in &self.jobs {
            if !hosts.insert(job.host()) {
                return Err(FleetError::DuplicateHost(job.host().clone()));
            }
            if !build_dirs.insert(job.build_dir_name()) {
                return Err(FleetError::DuplicateBuildDir(job.build_dir_name().to_string()));
            }
        }

        let post_build_hook = self.post_build_hook.filter(|hook| !hook.trim().is_empty());
        Ok(FleetConfig {
            bucket: self.bucket,
            distributed_elaboration: self.distributed_elaboration,
            post_build_hook,
            poll: self.poll,
            host_key_policy: self.host_key_policy,
            layout: self.layout,
            jobs: self.jobs,
        })
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
