// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline errors. Every variant routes the job to the failure path.

use fab_adapters::{CloudError, RemoteError, ShellError, SyncError};
use fab_core::TagError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A toolchain step on the build host exited non-zero.
    #[error("{stage} exited with code {code}")]
    Toolchain { stage: &'static str, code: i32 },
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("expected exactly one synthesis archive in {dir}, found {count}")]
    AmbiguousArtifact { dir: PathBuf, count: usize },
    #[error(transparent)]
    TagLength(#[from] TagError),
    #[error("image creation failed: {0}")]
    ImageCreation(#[source] CloudError),
    #[error("image {image_id} ended in state '{state}'")]
    ImageFailed { image_id: String, state: String },
    #[error("image status query failed: {0}")]
    Poll(#[source] CloudError),
    #[error("{step} failed: {detail}")]
    LocalToolchain { step: &'static str, detail: String },
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("image {image_id} still pending after {polls} polls")]
    PollTimeout { image_id: String, polls: u32 },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    pub(crate) fn shell(step: &'static str) -> impl FnOnce(ShellError) -> Self {
        move |e| PipelineError::LocalToolchain { step, detail: e.to_string() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PipelineError::Io { path, source }
    }
}
