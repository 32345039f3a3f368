// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local design generation and elaboration on the manager.

use fab_adapters::subprocess::shell_quote;
use fab_adapters::{CommandEnv, ShellAdapter};
use fab_core::{ArtifactSet, BuildJob, DeployLayout};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::PipelineError;

/// Manager environment script, relative to the repository root.
const MANAGER_ENV_SCRIPT: &str = "sourceme-f1-manager.sh";

/// Manager variables the toolchain needs that the environment script may not set.
const INHERITED_VARS: &[&str] = &["RISCV", "PATH", "LD_LIBRARY_PATH"];

/// Make invocations against the shared sim dir hold `sim_lock` for their
/// whole run; concurrent sbt/make runs in one project clobber each other.
pub struct LocalToolchainRunner<L> {
    shell: L,
    layout: DeployLayout,
    sim_lock: Arc<Mutex<()>>,
}

impl<L: ShellAdapter> LocalToolchainRunner<L> {
    pub fn new(shell: L, layout: DeployLayout) -> Self {
        Self { shell, layout, sim_lock: Arc::new(Mutex::new(())) }
    }

    /// Share a sim-dir lock with every other job's runner.
    pub fn with_sim_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.sim_lock = lock;
        self
    }

    /// Environment for make invocations: sourced manager env, run from the sim dir.
    pub fn make_env(&self) -> CommandEnv {
        let mut env = CommandEnv::new().cwd(self.layout.repo_root());
        for key in INHERITED_VARS {
            env = env.inherit(key);
        }
        env.setup(format!("source ./{}", MANAGER_ENV_SCRIPT))
            .setup(format!("cd {}", shell_quote(&self.layout.sim_dir().display().to_string())))
    }

    async fn run_make(&self, step: &'static str, command: &str) -> Result<(), PipelineError> {
        let _sim = self.sim_lock.lock().await;
        let code = self.shell.run(command, &self.make_env()).await.map_err(PipelineError::shell(step))?;
        if code != 0 {
            return Err(PipelineError::LocalToolchain { step, detail: format!("exit code {}", code) });
        }
        Ok(())
    }

    /// Value of make variable `name` for `job`'s configuration.
    ///
    /// The make database must yield exactly one `NAME = value` or
    /// `NAME := value` assignment.
    pub async fn make_var(&self, job: &BuildJob, name: &str) -> Result<String, PipelineError> {
        let command = format!(
            "{} | grep -E '^{} :?= '",
            job.make_recipe(&format!("echo ECHOVAR=\"{}\"", name)),
            name
        );
        let output = {
            let _sim = self.sim_lock.lock().await;
            self.shell.capture(&command, &self.make_env()).await.map_err(PipelineError::shell("make variable query"))?
        };
        let lines: Vec<&str> = output.stdout.lines().filter(|l| !l.trim().is_empty()).collect();
        match lines.as_slice() {
            [line] => parse_assignment(line, name).ok_or_else(|| PipelineError::LocalToolchain {
                step: "make variable query",
                detail: format!("unparseable assignment for {}: {}", name, line),
            }),
            _ => Err(PipelineError::LocalToolchain {
                step: "make variable query",
                detail: format!("expected one assignment of {}, got {}", name, lines.len()),
            }),
        }
    }

    /// Resolve the job's artifact paths from the make configuration.
    pub async fn resolve_artifacts(&self, job: &BuildJob) -> Result<ArtifactSet, PipelineError> {
        let generated_dir = self.make_var(job, "GENERATED_DIR").await?;
        let fat_jar = self.make_var(job, "FAT_JAR").await?;
        Ok(self.layout.artifacts(job, generated_dir, fat_jar))
    }

    /// Local elaboration: replace-rtl, keep a copy of the generated design in
    /// the results dir, then build the driver.
    pub async fn replace_rtl(&self, job: &BuildJob, artifacts: &ArtifactSet) -> Result<(), PipelineError> {
        tracing::info!(triplet = %job.triplet(), "running replace-rtl");
        self.run_make("replace-rtl", &job.make_recipe("replace-rtl")).await?;
        copy_generated_verilog(&artifacts.fpga_build_dir, artifacts).await?;
        self.build_driver(job, None).await
    }

    /// Distributed elaboration: package the elaboration bundle and its launch script.
    pub async fn gen_replace_rtl_script(&self, job: &BuildJob) -> Result<(), PipelineError> {
        tracing::info!(triplet = %job.triplet(), "generating elaboration bundle and replace-rtl.sh");
        self.run_make("gen-replace-rtl-script", &job.make_recipe("--quiet gen-replace-rtl-script"))
            .await
    }

    /// Build the host driver. `generated_dir` overrides where make finds the
    /// generated sources (a pulled-back copy after distributed elaboration).
    pub async fn build_driver(&self, job: &BuildJob, generated_dir: Option<&Path>) -> Result<(), PipelineError> {
        tracing::info!(triplet = %job.triplet(), "building driver");
        let command = match generated_dir {
            Some(dir) => {
                let dir = shell_quote(&dir.display().to_string());
                job.make_recipe_with("f1", &[("GENERATED_DIR", dir.as_str())])
            }
            None => job.make_recipe("f1"),
        };
        self.run_make("driver build", &command).await
    }

    /// `HEAD` hash of the checkout, with `-dirty` when the worktree has changes.
    pub async fn commit_tag(&self) -> Result<String, PipelineError> {
        let env = CommandEnv::new().cwd(self.layout.deploy_dir());
        let head = self.shell.capture("git rev-parse HEAD", &env).await.map_err(PipelineError::shell("commit tag"))?;
        if !head.success() {
            return Err(PipelineError::LocalToolchain {
                step: "commit tag",
                detail: head.stderr.trim().to_string(),
            });
        }
        let status =
            self.shell.capture("git status --porcelain", &env).await.map_err(PipelineError::shell("commit tag"))?;
        let dirty = if status.stdout.trim().is_empty() { "" } else { "-dirty" };
        Ok(format!("{}{}", head.stdout.trim(), dirty))
    }

    /// Run the post-build hook with the job's results directory as its argument.
    pub async fn run_post_build_hook(&self, hook: &str, results_dir: &Path) -> Result<(), PipelineError> {
        let command = format!("{} {}", hook, shell_quote(&results_dir.display().to_string()));
        let env = CommandEnv::new().cwd(self.layout.deploy_dir());
        let code = self.shell.run(&command, &env).await.map_err(PipelineError::shell("post-build hook"))?;
        if code != 0 {
            return Err(PipelineError::LocalToolchain {
                step: "post-build hook",
                detail: format!("exit code {}", code),
            });
        }
        Ok(())
    }
}

/// Copy `<design_tree>/design/cl_firesim_generated.sv` into the results dir.
pub(crate) async fn copy_generated_verilog(design_tree: &Path, artifacts: &ArtifactSet) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(&artifacts.results_dir)
        .await
        .map_err(PipelineError::io(&artifacts.results_dir))?;
    let source = design_tree.join("design").join(fab_core::artifact::GENERATED_VERILOG);
    tokio::fs::copy(&source, artifacts.generated_verilog()).await.map_err(PipelineError::io(source))?;
    Ok(())
}

/// Value of a `NAME = value` / `NAME := value` line.
fn parse_assignment(line: &str, name: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(name)?.trim_start();
    let rest = rest.strip_prefix(":=").or_else(|| rest.strip_prefix('='))?;
    Some(rest.trim().to_string())
}

#[cfg(test)]
#[path = "toolchain_tests.rs"]
mod tests;
