// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build recipe parsing (TOML) into a validated [`FleetConfig`].
//!
//! ```toml
//! # Nightly rocket builds
//! bucket = "${FAB_BUCKET:-firesim-images}"
//! distributed_elaboration = true
//! post_build_hook = "scripts/after-build.sh"
//!
//! [ssh]
//! user = "centos"
//! identity = "${HOME}/firesim.pem"
//!
//! [notify]
//! kind = "sns"
//! topic_arn = "arn:aws:sns:us-east-1:123456789012:firesim"
//!
//! [[build]]
//! name = "rocket"
//! design = "FireSim"
//! target_config = "FireSimRocketConfig"
//! platform_config = "BaseF1Config"
//! host = "10.0.0.12"
//! ```

use fab_core::{
    BuildJob, DeployLayout, FleetConfig, FleetError, HostKeyPolicy, PollConfig, Triplet,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::template::{expand_env, unresolved};

/// Errors from loading a build recipe
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("cannot read recipe {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid recipe: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{field}: environment variable {var} is not set")]
    Unresolved { field: String, var: String },
    #[error("recipe defines no [[build]] entries")]
    NoBuilds,
    #[error(transparent)]
    Fleet(#[from] FleetError),
}

/// Where build notifications go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum NotifyTarget {
    #[default]
    Desktop,
    Sns {
        topic_arn: String,
    },
    Silent,
}

/// SSH access to build hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshSettings {
    pub user: Option<String>,
    pub identity: Option<PathBuf>,
}

/// Settings supplied outside the recipe file (environment, CLI).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub deploy_dir: Option<PathBuf>,
    pub poll_interval: Option<Duration>,
    pub max_polls: Option<u32>,
}

/// A loaded recipe: the fleet plus how to reach it.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub fleet: FleetConfig,
    pub ssh: SshSettings,
    pub region: Option<String>,
    pub notify: NotifyTarget,
    /// Leading comment block of the recipe file.
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeFile {
    bucket: String,
    #[serde(default)]
    distributed_elaboration: bool,
    post_build_hook: Option<String>,
    #[serde(default)]
    host_key_policy: HostKeyPolicy,
    deploy_dir: Option<PathBuf>,
    platform_root: Option<PathBuf>,
    sim_dir: Option<PathBuf>,
    region: Option<String>,
    #[serde(default)]
    ssh: SshSettings,
    #[serde(default)]
    notify: NotifyTarget,
    #[serde(default)]
    poll: PollSection,
    #[serde(default, rename = "build")]
    builds: Vec<BuildSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollSection {
    interval_secs: Option<u64>,
    max_polls: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildSection {
    name: String,
    design: String,
    target_config: String,
    platform_config: String,
    deploy_triplet: Option<String>,
    host: String,
    instance_id: Option<String>,
    build_dir: Option<String>,
    make: Option<String>,
}

/// Read and parse the recipe at `path`. Relative paths in the recipe resolve
/// against the recipe's directory.
pub fn load_recipe(path: &Path, overrides: &Overrides) -> Result<Recipe, RecipeError> {
    tracing::debug!(path = %path.display(), "loading recipe");
    let content = std::fs::read_to_string(path)
        .map_err(|source| RecipeError::Io { path: path.to_path_buf(), source })?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    parse_recipe(&content, &base, overrides)
}

/// Parse recipe text. `base` anchors relative paths.
pub fn parse_recipe(content: &str, base: &Path, overrides: &Overrides) -> Result<Recipe, RecipeError> {
    let file: RecipeFile = toml::from_str(content)?;
    if file.builds.is_empty() {
        return Err(RecipeError::NoBuilds);
    }

    let resolve = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { base.join(p) };
    let expand_path = |field: &str, p: &Path| -> Result<PathBuf, RecipeError> {
        Ok(resolve(Path::new(&expand(field, &p.display().to_string())?)))
    };

    let deploy_dir = match (&overrides.deploy_dir, &file.deploy_dir) {
        (Some(dir), _) => dir.clone(),
        (None, Some(dir)) => expand_path("deploy_dir", dir)?,
        (None, None) => base.to_path_buf(),
    };
    let mut layout = DeployLayout::new(deploy_dir);
    if let Some(root) = &file.platform_root {
        layout = layout.with_platform_root(expand_path("platform_root", root)?);
    }
    if let Some(sim) = &file.sim_dir {
        layout = layout.with_sim_dir(expand_path("sim_dir", sim)?);
    }

    let mut poll = PollConfig::default();
    if let Some(secs) = file.poll.interval_secs {
        poll.interval = Duration::from_secs(secs);
    }
    if let Some(max) = file.poll.max_polls {
        poll.max_polls = max;
    }
    if let Some(interval) = overrides.poll_interval {
        poll.interval = interval;
    }
    if let Some(max) = overrides.max_polls {
        poll.max_polls = max;
    }

    let mut builder = FleetConfig::builder(expand("bucket", &file.bucket)?, layout)
        .distributed_elaboration(file.distributed_elaboration)
        .poll(poll)
        .host_key_policy(file.host_key_policy);
    if let Some(hook) = &file.post_build_hook {
        builder = builder.post_build_hook(expand("post_build_hook", hook)?);
    }

    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for build in &file.builds {
        *name_counts.entry(build.name.as_str()).or_default() += 1;
    }
    for build in &file.builds {
        let shared = name_counts.get(build.name.as_str()).copied().unwrap_or(0) > 1;
        builder = builder.job(job_from_section(build, shared)?);
    }

    let ssh = SshSettings {
        user: file.ssh.user.as_deref().map(|u| expand("ssh.user", u)).transpose()?,
        identity: file.ssh.identity.as_deref().map(|p| expand_path("ssh.identity", p)).transpose()?,
    };
    let notify = match file.notify {
        NotifyTarget::Sns { topic_arn } => {
            NotifyTarget::Sns { topic_arn: expand("notify.topic_arn", &topic_arn)? }
        }
        other => other,
    };

    Ok(Recipe {
        fleet: builder.build()?,
        ssh,
        region: file.region.as_deref().map(|r| expand("region", r)).transpose()?,
        notify,
        description: leading_comment(content),
    })
}

/// Same-named builds get `<name>-<host>` build dirs so results never collide.
fn job_from_section(build: &BuildSection, shared_name: bool) -> Result<BuildJob, RecipeError> {
    let field = |f: &str| format!("build.{}.{}", build.name, f);
    let triplet = Triplet::new(
        expand(&field("design"), &build.design)?,
        expand(&field("target_config"), &build.target_config)?,
        expand(&field("platform_config"), &build.platform_config)?,
    );
    let host = expand(&field("host"), &build.host)?;
    let build_dir = match &build.build_dir {
        Some(dir) => dir.clone(),
        None if shared_name => {
            let dir = format!("{}-{}", build.name, host);
            tracing::info!(name = %build.name, %host, build_dir = %dir, "shared build name; using host-qualified dir");
            dir
        }
        None => build.name.clone(),
    };

    let mut job = BuildJob::builder(build.name.clone(), triplet, host).build_dir_name(build_dir);
    if let Some(deploy) = &build.deploy_triplet {
        job = job.deploy_triplet_override(deploy.clone());
    }
    if let Some(id) = &build.instance_id {
        job = job.instance_id(expand(&field("instance_id"), id)?);
    }
    if let Some(make) = &build.make {
        job = job.make_program(make.clone());
    }
    Ok(job.build()?)
}

fn expand(field: &str, value: &str) -> Result<String, RecipeError> {
    let expanded = expand_env(value);
    match unresolved(&expanded) {
        Some(var) => Err(RecipeError::Unresolved { field: field.to_string(), var }),
        None => Ok(expanded),
    }
}

/// Leading `#` comment block, `# ` prefixes stripped.
pub fn leading_comment(content: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(text) = trimmed.strip_prefix('#') {
            lines.push(text.strip_prefix(' ').unwrap_or(text).to_string());
        } else if trimmed.is_empty() && lines.is_empty() {
            continue;
        } else {
            break;
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
