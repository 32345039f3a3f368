// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager-side directory layout and per-job artifact paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::job::BuildJob;

/// Vendor template tree, relative to the platform root.
pub const TEMPLATE_DIR: &str = "hdk/cl/developer_designs/cl_firesim";

/// Parent of every per-design vendor build tree, relative to the platform root.
pub const DEVELOPER_DESIGNS_DIR: &str = "hdk/cl/developer_designs";

/// Per-job scratch state excluded from pushes so it never lands on a host.
pub const CHECKPOINTS_EXCLUDE: &str = "build/checkpoints";

/// Name of the synthesized top-level file produced by elaboration.
pub const GENERATED_VERILOG: &str = "cl_firesim_generated.sv";

/// Directory layout of the deploy tree on the manager.
///
/// Build hosts mirror the platform tree at the same absolute paths, so the
/// remote side of every transfer is derived from this layout too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployLayout {
    deploy_dir: PathBuf,
    platform_root: PathBuf,
    sim_dir: PathBuf,
}

impl DeployLayout {
    /// Standard layout: `<deploy>/../platforms/f1/aws-fpga` and `<deploy>/../sim`.
    pub fn new(deploy_dir: impl Into<PathBuf>) -> Self {
        let deploy_dir = deploy_dir.into();
        let parent = deploy_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| deploy_dir.clone());
        Self {
            platform_root: parent.join("platforms/f1/aws-fpga"),
            sim_dir: parent.join("sim"),
            deploy_dir,
        }
    }

    pub fn with_platform_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.platform_root = root.into();
        self
    }

    pub fn with_sim_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sim_dir = dir.into();
        self
    }

    pub fn deploy_dir(&self) -> &Path {
        &self.deploy_dir
    }

    pub fn platform_root(&self) -> &Path {
        &self.platform_root
    }

    /// Working directory for local toolchain (make) invocations.
    pub fn sim_dir(&self) -> &Path {
        &self.sim_dir
    }

    /// Repository root, where the manager environment script lives.
    pub fn repo_root(&self) -> PathBuf {
        self.deploy_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| self.deploy_dir.clone())
    }

    pub fn template_dir(&self) -> PathBuf {
        self.platform_root.join(TEMPLATE_DIR)
    }

    pub fn results_root(&self) -> PathBuf {
        self.deploy_dir.join("results-build")
    }

    pub fn hwdb_entries_dir(&self) -> PathBuf {
        self.deploy_dir.join("built-hwdb-entries")
    }

    /// Vendor build tree for a job's design, identical on manager and host.
    pub fn fpga_build_dir(&self, job: &BuildJob) -> PathBuf {
        self.platform_root.join(DEVELOPER_DESIGNS_DIR).join(job.fpga_build_dir_name())
    }

    pub fn results_dir(&self, job: &BuildJob) -> PathBuf {
        self.results_root().join(job.build_dir_name())
    }

    /// Per-job timestamped activity log.
    pub fn activity_log_path(&self, job: &BuildJob) -> PathBuf {
        self.results_dir(job).join("build.log")
    }

    /// Final [`BuildOutcome`](crate::BuildOutcome) of the job, as JSON.
    pub fn outcome_path(&self, job: &BuildJob) -> PathBuf {
        self.results_dir(job).join("outcome.json")
    }

    /// Named after the build dir so same-named jobs in one run never share a record.
    pub fn hwdb_entry_path(&self, job: &BuildJob) -> PathBuf {
        self.hwdb_entries_dir().join(job.build_dir_name())
    }

    /// Resolve every path a job touches, given the two make-derived locations.
    pub fn artifacts(
        &self,
        job: &BuildJob,
        generated_dir: impl Into<PathBuf>,
        elaboration_bundle: impl Into<PathBuf>,
    ) -> ArtifactSet {
        ArtifactSet {
            generated_dir: generated_dir.into(),
            elaboration_bundle: elaboration_bundle.into(),
            fpga_build_dir: self.fpga_build_dir(job),
            results_dir: self.results_dir(job),
        }
    }
}

/// Paths produced and consumed by one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// Generated-code directory (holds the launch script in distributed mode).
    pub generated_dir: PathBuf,
    /// Packaged elaboration bundle (fat jar) shipped to the host.
    pub elaboration_bundle: PathBuf,
    /// Vendor build tree (`cl_<triplet>`), same path on manager and host.
    pub fpga_build_dir: PathBuf,
    /// Per-job results directory on the manager.
    pub results_dir: PathBuf,
}

impl ArtifactSet {
    /// Where the finished vendor tree is pulled after synthesis.
    pub fn results_build_tree(&self) -> PathBuf {
        self.results_dir.join("cl_firesim")
    }

    /// Directory that must hold exactly one synthesis archive.
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.results_build_tree().join("build/checkpoints/to_aws")
    }

    /// Job-private copy of the generated dir pulled back from the host.
    pub fn pulled_generated_dir(&self) -> PathBuf {
        self.results_dir.join("generated-src")
    }

    /// Job-private copy of the elaborated vendor tree pulled back from the host.
    pub fn pulled_design_tree(&self) -> PathBuf {
        self.results_dir.join("elaborated")
    }

    pub fn generated_verilog(&self) -> PathBuf {
        self.results_dir.join(GENERATED_VERILOG)
    }

    /// Launch script produced by `gen-replace-rtl-script`.
    pub fn elaboration_script(&self) -> PathBuf {
        self.generated_dir.join("replace-rtl.sh")
    }

    pub fn image_info_path(&self) -> PathBuf {
        self.results_dir.join("AGFI_INFO")
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
