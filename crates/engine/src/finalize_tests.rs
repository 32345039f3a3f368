// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fab_adapters::{CloudCall, FakeCloud, FakeShell};
use fab_core::test_support::test_job;
use fab_core::{ImageDescription, ImageIds, StorageKey};
use std::path::PathBuf;

fn image() -> CloudImage {
    CloudImage::new(
        PathBuf::from("x.tar"),
        StorageKey::with_suffix("x.tar", &"h1".into(), "ABCDEFGHIJ"),
        ImageIds { image_id: "afi-7".into(), global_image_id: "agfi-7".into() },
        ImageDescription::new("a", "a", "c").unwrap(),
    )
}

#[tokio::test]
async fn writes_record_replicates_and_runs_hook() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = DeployLayout::new(tmp.path().join("deploy"));
    let job = test_job("rocket", "h1");
    let artifacts = layout.artifacts(&job, "/gen", "/fat.jar");
    let cloud = FakeCloud::new();
    let shell = FakeShell::new();
    let toolchain = LocalToolchainRunner::new(shell.clone(), layout.clone());

    let entry = finalize(&cloud, &toolchain, &layout, Some("./hook.sh"), &job, &image(), &artifacts)
        .await
        .unwrap();

    assert_eq!(entry, HwdbEntry::new("rocket", "agfi-7"));
    let record = std::fs::read_to_string(layout.hwdb_entry_path(&job)).unwrap();
    assert_eq!(record, "[rocket]\nagfi=agfi-7\ndeploytripletoverride=None\ncustomruntimeconfig=None\n\n");
    assert_eq!(cloud.calls(), vec![CloudCall::CopyToAllRegions { image_id: "afi-7".into() }]);
    assert_eq!(shell.commands(), vec![format!("./hook.sh {}", artifacts.results_dir.display())]);
}

#[tokio::test]
async fn hook_failure_keeps_success() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = DeployLayout::new(tmp.path().join("deploy"));
    let job = test_job("rocket", "h1");
    let artifacts = layout.artifacts(&job, "/gen", "/fat.jar");
    let shell = FakeShell::new();
    shell.fail("hook.sh", 1);
    let toolchain = LocalToolchainRunner::new(shell, layout.clone());

    let result = finalize(&FakeCloud::new(), &toolchain, &layout, Some("./hook.sh"), &job, &image(), &artifacts).await;
    assert!(result.is_ok());
    assert!(layout.hwdb_entry_path(&job).exists());
}

#[tokio::test]
async fn no_hook_runs_no_command() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = DeployLayout::new(tmp.path().join("deploy"));
    let job = test_job("rocket", "h1");
    let artifacts = layout.artifacts(&job, "/gen", "/fat.jar");
    let shell = FakeShell::new();
    let toolchain = LocalToolchainRunner::new(shell.clone(), layout.clone());

    finalize(&FakeCloud::new(), &toolchain, &layout, None, &job, &image(), &artifacts).await.unwrap();
    assert!(shell.commands().is_empty());
}
