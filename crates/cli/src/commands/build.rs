// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fab build`: run every job in a recipe on its build host.

use anyhow::Result;
use clap::Args;
use fab_adapters::{
    AwsCliAdapter, DesktopNotifyAdapter, LocalShell, Notifier, RsyncAdapter, SnsNotifyAdapter, SshOptions,
    SshRemote,
};
use fab_engine::{FleetReport, FleetRunner, PipelineDeps};
use fab_recipe::{NotifyTarget, Recipe};
use std::fmt::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::color;
use crate::exit_error::{ExitError, BUILD_FAILED, INTERRUPTED};
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct BuildArgs {
    /// Path to the build recipe (TOML)
    pub recipe: PathBuf,
    /// Skip every stage and only release the build hosts
    #[arg(long)]
    pub bypass: bool,
    /// Deploy directory (overrides the recipe and FAB_DEPLOY_DIR)
    #[arg(long)]
    pub deploy_dir: Option<PathBuf>,
    #[arg(long = "output", short = 'o', value_enum, default_value_t)]
    pub format: OutputFormat,
}

type RealDeps = PipelineDeps<LocalShell, SshRemote, RsyncAdapter, AwsCliAdapter, Notifier>;

pub async fn handle(args: BuildArgs) -> Result<()> {
    let recipe = super::load(&args.recipe, args.deploy_dir)?;
    let deps = real_deps(&recipe);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling builds and releasing hosts");
            on_interrupt.cancel();
        }
    });

    let runner = FleetRunner::new(deps, recipe.fleet, cancel.clone());
    let report = runner.run(args.bypass).await;
    format_or_json(args.format, &report, || render(&report))?;

    if cancel.is_cancelled() {
        return Err(ExitError::new(INTERRUPTED, "interrupted").into());
    }
    let failed = report.failed().count();
    if failed > 0 {
        return Err(ExitError::new(BUILD_FAILED, format!("{} of {} builds failed", failed, report.jobs.len())).into());
    }
    Ok(())
}

pub fn ssh_options(recipe: &Recipe) -> SshOptions {
    let mut options = SshOptions::new(recipe.fleet.host_key_policy());
    if let Some(user) = &recipe.ssh.user {
        options = options.user(user);
    }
    if let Some(identity) = &recipe.ssh.identity {
        options = options.identity(identity);
    }
    options
}

pub fn notifier(target: &NotifyTarget) -> Notifier {
    match target {
        NotifyTarget::Desktop => Notifier::Desktop(DesktopNotifyAdapter::new()),
        NotifyTarget::Sns { topic_arn } => Notifier::Sns(SnsNotifyAdapter::new(topic_arn)),
        NotifyTarget::Silent => Notifier::Silent,
    }
}

fn real_deps(recipe: &Recipe) -> RealDeps {
    let ssh = ssh_options(recipe);
    PipelineDeps::new(
        LocalShell::default(),
        SshRemote::new(ssh.clone()),
        RsyncAdapter::new(ssh),
        AwsCliAdapter::new(recipe.region.clone()),
        notifier(&recipe.notify),
    )
}

pub fn render(report: &FleetReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", color::header("Run"), color::context(&report.run_id.to_string()));
    for job in &report.jobs {
        let _ = writeln!(
            out,
            "  {:<16} {:<16} {}",
            job.name,
            color::literal(job.host.as_str()),
            color::outcome(&job.outcome)
        );
    }
    if let Some(aborted) = &report.aborted {
        let _ = writeln!(out, "{}", color::context(&aborted.to_string()));
    }
    out
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
