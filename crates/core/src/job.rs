// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build job identity: triplet, host binding and make-recipe capability.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fleet::FleetError;

/// Address of a build host (private IP or resolvable hostname).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostAddr(String);

impl HostAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostAddr {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HostAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The design/target/platform configuration triple identifying what a job builds.
///
/// Rendered as `DESIGN-TARGET_CONFIG-PLATFORM_CONFIG`, which also names the
/// job's vendor build tree (`cl_<triplet>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub design: String,
    pub target_config: String,
    pub platform_config: String,
}

impl Triplet {
    pub fn new(
        design: impl Into<String>,
        target_config: impl Into<String>,
        platform_config: impl Into<String>,
    ) -> Self {
        Self {
            design: design.into(),
            target_config: target_config.into(),
            platform_config: platform_config.into(),
        }
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.design, self.target_config, self.platform_config)
    }
}

/// One FPGA build, bound to a single host for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildJob {
    name: String,
    triplet: Triplet,
    deploy_triplet_override: Option<String>,
    build_dir_name: String,
    host: HostAddr,
    instance_id: Option<String>,
    make_program: String,
}

impl BuildJob {
    pub fn builder(
        name: impl Into<String>,
        triplet: Triplet,
        host: impl Into<HostAddr>,
    ) -> BuildJobBuilder {
        BuildJobBuilder {
            name: name.into(),
            triplet,
            host: host.into(),
            build_dir_name: String::new(),
            deploy_triplet_override: None,
            instance_id: None,
            make_program: "make".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triplet(&self) -> &Triplet {
        &self.triplet
    }

    /// Deploy-time triplet, falling back to the build triplet.
    pub fn deploy_triplet(&self) -> String {
        match &self.deploy_triplet_override {
            Some(t) => t.clone(),
            None => self.triplet.to_string(),
        }
    }

    pub fn deploy_triplet_override(&self) -> Option<&str> {
        self.deploy_triplet_override.as_deref()
    }

    pub fn build_dir_name(&self) -> &str {
        &self.build_dir_name
    }

    pub fn host(&self) -> &HostAddr {
        &self.host
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Name of the vendor build tree for this job's design.
    pub fn fpga_build_dir_name(&self) -> String {
        format!("cl_{}", self.triplet)
    }

    /// Shell command that builds `target` for this job's configuration.
    pub fn make_recipe(&self, target: &str) -> String {
        self.make_recipe_with(target, &[])
    }

    /// Like [`make_recipe`](Self::make_recipe) with extra make variable overrides.
    pub fn make_recipe_with(&self, target: &str, overrides: &[(&str, &str)]) -> String {
        let mut cmd = format!(
            "{} DESIGN={} TARGET_CONFIG={} PLATFORM_CONFIG={}",
            self.make_program,
            self.triplet.design,
            self.triplet.target_config,
            self.triplet.platform_config
        );
        for (key, value) in overrides {
            cmd.push_str(&format!(" {}={}", key, value));
        }
        cmd.push(' ');
        cmd.push_str(target);
        cmd
    }
}

/// Builder for [`BuildJob`], validated at [`build`](BuildJobBuilder::build).
#[derive(Debug, Clone)]
pub struct BuildJobBuilder {
    name: String,
    triplet: Triplet,
    host: HostAddr,
    build_dir_name: String,
    deploy_triplet_override: Option<String>,
    instance_id: Option<String>,
    make_program: String,
}

impl BuildJobBuilder {
    crate::setters! {
        into { build_dir_name: String, make_program: String }
        option { deploy_triplet_override: String, instance_id: String }
    }

    pub fn build(self) -> Result<BuildJob, FleetError> {
        if self.name.trim().is_empty() {
            return Err(FleetError::InvalidJob { name: self.name, reason: "empty name".into() });
        }
        if self.host.as_str().trim().is_empty() {
            return Err(FleetError::InvalidJob { name: self.name, reason: "empty host".into() });
        }
        for part in [
            &self.triplet.design,
            &self.triplet.target_config,
            &self.triplet.platform_config,
        ] {
            if part.trim().is_empty() {
                return Err(FleetError::InvalidJob {
                    name: self.name,
                    reason: "incomplete triplet".into(),
                });
            }
        }
        let build_dir_name =
            if self.build_dir_name.is_empty() { self.name.clone() } else { self.build_dir_name };
        if build_dir_name.contains('/') || build_dir_name == "." || build_dir_name == ".." {
            return Err(FleetError::InvalidJob {
                name: self.name,
                reason: format!("build dir name '{}' is not a single path component", build_dir_name),
            });
        }
        // "None" is how recipes spell "no override"
        let deploy_triplet_override = self.deploy_triplet_override.filter(|t| t != "None");

        Ok(BuildJob {
            name: self.name,
            triplet: self.triplet,
            deploy_triplet_override,
            build_dir_name,
            host: self.host,
            instance_id: self.instance_id,
            make_program: self.make_program,
        })
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
