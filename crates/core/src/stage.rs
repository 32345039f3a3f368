// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline stages and terminal outcomes.

use serde::{Deserialize, Serialize};

/// A state in the per-job build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Local elaboration (or script generation when distributed).
    GenerateRtl,
    SyncSource,
    RemoteBuild,
    SyncResults,
    RegisterImage,
    PollCompletion,
    Success,
    Failure,
    Teardown,
}

impl Stage {
    /// Stages after which no further pipeline work may run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Success | Stage::Failure | Stage::Teardown)
    }
}

crate::simple_display! {
    Stage {
        GenerateRtl => "generate-rtl",
        SyncSource => "sync-source",
        RemoteBuild => "remote-build",
        SyncResults => "sync-results",
        RegisterImage => "register-image",
        PollCompletion => "poll-completion",
        Success => "success",
        Failure => "failure",
        Teardown => "teardown",
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuildOutcome {
    Succeeded { global_image_id: String },
    Failed { stage: Stage, reason: String },
    /// Bypass mode: host released without running any stage.
    Bypassed,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Succeeded { .. })
    }
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildOutcome::Succeeded { global_image_id } => write!(f, "succeeded ({})", global_image_id),
            BuildOutcome::Failed { stage, reason } => write!(f, "failed at {}: {}", stage, reason),
            BuildOutcome::Bypassed => f.write_str("bypassed"),
        }
    }
}
