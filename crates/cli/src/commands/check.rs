// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fab check`: validate a recipe and print the job plan without touching
//! any host.

use anyhow::Result;
use clap::Args;
use fab_recipe::{NotifyTarget, Recipe};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

use crate::color;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the build recipe (TOML)
    pub recipe: PathBuf,
    /// Deploy directory (overrides the recipe and FAB_DEPLOY_DIR)
    #[arg(long)]
    pub deploy_dir: Option<PathBuf>,
    #[arg(long = "output", short = 'o', value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct Plan {
    pub description: Option<String>,
    pub bucket: String,
    pub elaboration: &'static str,
    pub deploy_dir: PathBuf,
    pub platform_root: PathBuf,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
    pub notify: String,
    pub post_build_hook: Option<String>,
    pub jobs: Vec<PlannedJob>,
}

#[derive(Debug, Serialize)]
pub struct PlannedJob {
    pub name: String,
    pub triplet: String,
    pub deploy_triplet: String,
    pub host: String,
    pub results_dir: PathBuf,
    pub hwdb_entry: PathBuf,
}

pub fn handle(args: CheckArgs) -> Result<()> {
    let recipe = super::load(&args.recipe, args.deploy_dir)?;
    let plan = plan(&recipe);
    format_or_json(args.format, &plan, || render(&plan))
}

pub fn plan(recipe: &Recipe) -> Plan {
    let fleet = &recipe.fleet;
    let layout = fleet.layout();
    let jobs = fleet
        .jobs()
        .iter()
        .map(|job| PlannedJob {
            name: job.name().to_string(),
            triplet: job.triplet().to_string(),
            deploy_triplet: job.deploy_triplet(),
            host: job.host().to_string(),
            results_dir: layout.results_dir(job),
            hwdb_entry: layout.hwdb_entry_path(job),
        })
        .collect();
    Plan {
        description: recipe.description.clone(),
        bucket: fleet.bucket().to_string(),
        elaboration: if fleet.distributed_elaboration() { "distributed" } else { "local" },
        deploy_dir: layout.deploy_dir().to_path_buf(),
        platform_root: layout.platform_root().to_path_buf(),
        poll_interval_secs: fleet.poll().interval.as_secs(),
        max_polls: fleet.poll().max_polls,
        notify: match &recipe.notify {
            NotifyTarget::Desktop => "desktop".to_string(),
            NotifyTarget::Sns { topic_arn } => format!("sns ({})", topic_arn),
            NotifyTarget::Silent => "silent".to_string(),
        },
        post_build_hook: fleet.post_build_hook().map(str::to_string),
        jobs,
    }
}

pub fn render(plan: &Plan) -> String {
    let mut out = String::new();
    if let Some(description) = &plan.description {
        let _ = writeln!(out, "{}\n", color::context(description));
    }
    let _ = writeln!(out, "{}", color::header("Fleet:"));
    let _ = writeln!(out, "  bucket       {}", color::literal(&plan.bucket));
    let _ = writeln!(out, "  elaboration  {}", plan.elaboration);
    let _ = writeln!(out, "  deploy dir   {}", color::context(&plan.deploy_dir.display().to_string()));
    let _ = writeln!(out, "  polling      every {}s, at most {} polls", plan.poll_interval_secs, plan.max_polls);
    let _ = writeln!(out, "  notify       {}", plan.notify);
    if let Some(hook) = &plan.post_build_hook {
        let _ = writeln!(out, "  post-build   {}", color::literal(hook));
    }
    let _ = writeln!(out, "\n{} ({})", color::header("Jobs:"), plan.jobs.len());
    for job in &plan.jobs {
        let _ = writeln!(out, "  {} on {}", color::literal(&job.name), color::literal(&job.host));
        let _ = writeln!(out, "    triplet  {}", job.triplet);
        if job.deploy_triplet != job.triplet {
            let _ = writeln!(out, "    deploy   {}", job.deploy_triplet);
        }
        let _ = writeln!(out, "    results  {}", color::context(&job.results_dir.display().to_string()));
    }
    out
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
