// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded wait for an image to leave `pending`.

use fab_adapters::CloudAdapter;
use fab_core::{CloudImage, ImageState, PollConfig};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

pub struct CompletionPoller<C> {
    cloud: C,
    config: PollConfig,
}

impl<C: CloudAdapter> CompletionPoller<C> {
    pub fn new(cloud: C, config: PollConfig) -> Self {
        Self { cloud, config }
    }

    /// Poll until `image` is terminal, writing each raw status response to
    /// `info_path`. Returns `Ok` only for `available`.
    pub async fn wait(
        &self,
        image: &mut CloudImage,
        info_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let image_id = image.ids.image_id.clone();
        for poll in 1..=self.config.max_polls {
            let status = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                status = self.cloud.describe_image(&image_id) => status.map_err(PipelineError::Poll)?,
            };
            if let Err(e) = tokio::fs::write(info_path, &status.raw).await {
                tracing::warn!(path = %info_path.display(), error = %e, "failed to write image status");
            }
            image.observe(status.state.clone());
            tracing::info!(%image_id, poll, state = %status.state, "image status");

            match status.state {
                ImageState::Available => return Ok(()),
                ImageState::Failed(code) => {
                    return Err(PipelineError::ImageFailed { image_id, state: code });
                }
                ImageState::Pending if poll < self.config.max_polls => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                        _ = tokio::time::sleep(self.config.interval) => {}
                    }
                }
                ImageState::Pending => {}
            }
        }
        Err(PipelineError::PollTimeout { image_id, polls: self.config.max_polls })
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
