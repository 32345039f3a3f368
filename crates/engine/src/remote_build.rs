// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Vendor toolchain runs on a build host.

use fab_adapters::subprocess::{shell_quote, REMOTE_COMMAND_TIMEOUT, SYNTHESIS_TIMEOUT, TOOLCHAIN_TIMEOUT};
use fab_adapters::{CommandEnv, RemoteAdapter};
use fab_core::HostAddr;
use std::path::Path;

use crate::error::PipelineError;

/// Packages the elaboration script needs on a fresh host.
pub const ELABORATION_PACKAGES: &str = "java dtc";

pub const SYNTHESIS_SCRIPT: &str = "./aws_build_dcp_from_cl.sh -foreground";

pub struct RemoteBuildExecutor<R> {
    remote: R,
}

impl<R: RemoteAdapter> RemoteBuildExecutor<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    /// Install elaboration prerequisites, then run the uploaded
    /// `replace-rtl.sh`. Any non-zero exit is a toolchain failure.
    pub async fn elaborate(&self, host: &HostAddr, script: &Path) -> Result<(), PipelineError> {
        let install = format!("sudo yum install -y {}", ELABORATION_PACKAGES);
        let code = self.remote.run(host, &install, &CommandEnv::new(), REMOTE_COMMAND_TIMEOUT).await?;
        if code != 0 {
            return Err(PipelineError::Toolchain { stage: "prerequisite install", code });
        }

        tracing::info!(%host, "running elaboration from bundle");
        let run = format!("bash -xe {}", shell_quote(&script.display().to_string()));
        let code = self.remote.run(host, &run, &CommandEnv::new(), TOOLCHAIN_TIMEOUT).await?;
        if code != 0 {
            return Err(PipelineError::Toolchain { stage: "elaboration", code });
        }
        Ok(())
    }

    /// Environment for the vendor build: hdk setup sourced, `CL_DIR` exported,
    /// run from the design's build scripts dir.
    pub fn synthesis_env(platform_root: &Path, fpga_build_dir: &Path) -> CommandEnv {
        CommandEnv::new()
            .cwd(platform_root)
            .var("CL_DIR", fpga_build_dir.display().to_string())
            .setup("source hdk_setup.sh")
            .setup("cd $CL_DIR/build/scripts/")
    }

    /// Run place-and-route in the foreground. The exit code is returned as a
    /// value; only transport failures are errors.
    pub async fn synthesize(
        &self,
        host: &HostAddr,
        platform_root: &Path,
        fpga_build_dir: &Path,
    ) -> Result<i32, PipelineError> {
        tracing::info!(%host, "running synthesis");
        let env = Self::synthesis_env(platform_root, fpga_build_dir);
        let code = self.remote.run(host, SYNTHESIS_SCRIPT, &env, SYNTHESIS_TIMEOUT).await?;
        tracing::info!(%host, code, "synthesis finished");
        Ok(code)
    }
}

#[cfg(test)]
#[path = "remote_build_tests.rs"]
mod tests;
