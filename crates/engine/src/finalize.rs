// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects of a successful build: replication, hwdb record, post-build hook.

use fab_adapters::{CloudAdapter, ShellAdapter};
use fab_core::{ArtifactSet, BuildJob, CloudImage, DeployLayout, HwdbEntry};

use crate::error::PipelineError;
use crate::toolchain::LocalToolchainRunner;

/// Run the success-path effects for an available image and return the
/// hwdb entry that was written.
///
/// Replication and hook failures are logged; the image is usable in its home
/// region and the record is already on disk by then.
pub async fn finalize<C: CloudAdapter, L: ShellAdapter>(
    cloud: &C,
    toolchain: &LocalToolchainRunner<L>,
    layout: &DeployLayout,
    post_build_hook: Option<&str>,
    job: &BuildJob,
    image: &CloudImage,
    artifacts: &ArtifactSet,
) -> Result<HwdbEntry, PipelineError> {
    if let Err(e) = cloud.copy_image_to_all_regions(&image.ids.image_id).await {
        tracing::warn!(image_id = %image.ids.image_id, error = %e, "image replication failed");
    }

    let entry = HwdbEntry::new(job.name(), &image.ids.global_image_id);
    write_hwdb_entry(layout, job, &entry).await?;

    if let Some(hook) = post_build_hook {
        tracing::info!(hook, results = %artifacts.results_dir.display(), "running post-build hook");
        if let Err(e) = toolchain.run_post_build_hook(hook, &artifacts.results_dir).await {
            tracing::warn!(error = %e, "post-build hook failed");
        }
    }
    Ok(entry)
}

/// Write the entry to `<deploy>/built-hwdb-entries/<build dir>`.
pub async fn write_hwdb_entry(layout: &DeployLayout, job: &BuildJob, entry: &HwdbEntry) -> Result<(), PipelineError> {
    let dir = layout.hwdb_entries_dir();
    tokio::fs::create_dir_all(&dir).await.map_err(PipelineError::io(&dir))?;
    let path = layout.hwdb_entry_path(job);
    tokio::fs::write(&path, entry.to_string()).await.map_err(PipelineError::io(&path))?;
    tracing::info!(path = %path.display(), "hwdb entry written");
    Ok(())
}

#[cfg(test)]
#[path = "finalize_tests.rs"]
mod tests;
