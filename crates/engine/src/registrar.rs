// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synthesis archive upload and image creation.

use fab_adapters::{CloudAdapter, CreateImageRequest};
use fab_core::{ArtifactSet, BuildJob, CloudImage, ImageDescription, StorageKey};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Provider-side prefix for image creation logs.
pub const LOGS_PREFIX: &str = "logs/";

pub struct ImageRegistrar<C> {
    cloud: C,
    bucket: String,
}

impl<C: CloudAdapter> ImageRegistrar<C> {
    pub fn new(cloud: C, bucket: impl Into<String>) -> Self {
        Self { cloud, bucket: bucket.into() }
    }

    /// Upload the job's single archive and request image creation.
    ///
    /// Archive lookup and tag validation both happen before any network call.
    pub async fn register(
        &self,
        job: &BuildJob,
        artifacts: &ArtifactSet,
        commit: &str,
    ) -> Result<CloudImage, PipelineError> {
        let archive = locate_archive(&artifacts.checkpoint_dir()).await?;
        let description = ImageDescription::new(job.triplet().to_string(), job.deploy_triplet(), commit)?;

        let archive_name = archive.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let key = StorageKey::generate(&archive_name, job.host());
        tracing::info!(bucket = %self.bucket, %key, "uploading synthesis archive");
        self.cloud.put_object(&self.bucket, &key, &archive).await.map_err(PipelineError::ImageCreation)?;

        let request = CreateImageRequest {
            bucket: self.bucket.clone(),
            key: key.clone(),
            logs_prefix: LOGS_PREFIX.to_string(),
            name: job.name().to_string(),
            description: description.to_string(),
        };
        let ids = self.cloud.create_image(&request).await.map_err(PipelineError::ImageCreation)?;
        tracing::info!(image_id = %ids.image_id, global_image_id = %ids.global_image_id, "image requested");
        Ok(CloudImage::new(archive, key, ids, description))
    }
}

/// The single `*.tar` in `dir`. Zero or several is an error.
pub async fn locate_archive(dir: &Path) -> Result<PathBuf, PipelineError> {
    let mut archives = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if is_file && path.extension().is_some_and(|ext| ext == "tar") {
                archives.push(path);
            }
        }
    }
    match archives.len() {
        1 => Ok(archives.remove(0)),
        count => Err(PipelineError::AmbiguousArtifact { dir: dir.to_path_buf(), count }),
    }
}

#[cfg(test)]
#[path = "registrar_tests.rs"]
mod tests;
